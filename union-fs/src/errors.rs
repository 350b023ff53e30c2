//! Startup-time error types.
//!
//! Errors encountered while *serving* requests are never represented here:
//! those are translated directly into `libc::c_int` at the `FilesystemMT`
//! boundary (see `fs::dispatch_error`) and handed back to the kernel.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("usage: union-fs <MOUNTPOINT> <ALTERNATE_DIR> [ALTERNATE_PATH]...")]
    MissingArguments,

    #[error("alternate path {0:?} must not begin or end with '/'")]
    InvalidAlternatePath(String),

    #[error("must run as root to switch effective uid/gid per request")]
    NotPrivileged,

    #[error("failed to open backend directory {path:?}: {source}")]
    BackendUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
