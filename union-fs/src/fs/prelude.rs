//! This prelude module re-exports all common types, traits, and functions
//! used across the `fs` module's sub-files (e.g., `data.rs`, `dir.rs`).
//!
//! This avoids repetitive imports in every file and provides a single
//! location to manage shared dependencies for the FUSE implementation.

// --- fuse_mt Types ---
/// Re-exports the path-based FUSE trait and its associated types.
pub use fuse_mt::{
    CallbackResult, CreatedEntry, DirectoryEntry, FileAttr, FilesystemMT, RequestInfo,
    ResultCreate, ResultData, ResultEmpty, ResultEntry, ResultOpen, ResultReaddir, ResultSlice,
    ResultWrite, ResultXattr, Statfs, Xattr,
};

// --- Standard Library Types ---
pub use std::ffi::OsStr;
pub use std::path::Path;
pub use std::time::{Duration, SystemTime};

// --- Internal Project Modules ---
pub use super::{ioerr, join_rel, UnionFs, ENTRY_TTL};
pub use crate::identity::Impersonation;
