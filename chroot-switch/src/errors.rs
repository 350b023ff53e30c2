//! Startup/pre-exec error types. Every variant here maps to a
//! process exit before any command is executed.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    #[error("usage: chroot-switch <client> [command [args...]]")]
    MissingArguments,

    #[error(
        "missing CAP_SYS_CHROOT in the permitted and effective capability sets; \
         run as root or grant the capability to this executable (setcap cap_sys_chroot+ep)"
    )]
    MissingCapability,

    #[error("config file {0:?} failed its security check (ownership/permissions)")]
    InsecureConfig(PathBuf),

    #[error("client root {0:?} does not exist or is not accessible")]
    ClientUnavailable(PathBuf),

    #[error("could not determine the real filesystem root while escaping the chroot")]
    EscapeFailed,

    #[error("failed to exec {0:?}: {1}")]
    ExecFailed(PathBuf, #[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Nix(#[from] nix::Error),
}
