//! The change-root capability preflight.
//!
//! This must run before any other work: escaping a jail, reading the
//! per-client config, and re-rooting all require `CAP_SYS_CHROOT`. Failing
//! fast here gives a targeted remediation message instead of a bare
//! `EPERM` from `chroot(2)` partway through.

use caps::{CapSet, Capability};

use crate::errors::SwitchError;

pub fn ensure_cap_sys_chroot() -> Result<(), SwitchError> {
    let permitted = caps::has_cap(None, CapSet::Permitted, Capability::CAP_SYS_CHROOT)
        .unwrap_or(false);
    let effective = caps::has_cap(None, CapSet::Effective, Capability::CAP_SYS_CHROOT)
        .unwrap_or(false);

    if permitted && effective {
        Ok(())
    } else {
        Err(SwitchError::MissingCapability)
    }
}
