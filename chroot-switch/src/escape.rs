//! Escaping a possibly-inherited chroot jail.
//!
//! Relies on the invariant that the real filesystem root is the unique
//! directory whose parent is itself by (device, inode). `CONFIGDIR` is
//! known to exist on the real root (the config-security check for the
//! requested client — or the `pid1` alias — would have already aborted
//! otherwise), so re-rooting to it from the topmost reachable directory
//! places the working directory below the real root, from which the
//! fixed point can be found by repeated ascent.

use std::path::Path;

use nix::unistd::{chdir, chroot};

use crate::client::CONFIG_DIR;
use crate::errors::SwitchError;

/// Ascending more than this many levels indicates a malformed or
/// pathological mount topology rather than a normal chroot depth.
const MAX_ASCENT: u32 = 4096;

fn dev_ino(path: &str) -> Result<(u64, u64), SwitchError> {
    let st = nix::sys::stat::lstat(path)?;
    Ok((st.st_dev as u64, st.st_ino as u64))
}

pub fn break_out_of_chroot() -> Result<(), SwitchError> {
    chdir("/")?;
    chroot(Path::new(CONFIG_DIR))?;

    for _ in 0..MAX_ASCENT {
        chdir("..")?;
        let here = dev_ino(".")?;
        let parent = dev_ino("..")?;
        if here == parent {
            chroot(".")?;
            return Ok(());
        }
    }

    Err(SwitchError::EscapeFailed)
}
