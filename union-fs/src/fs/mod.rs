//! This module is the root of the FUSE filesystem implementation.
//!
//! It defines the main `UnionFs` state struct, which holds the two backend
//! directory descriptors and the routing table.
//!
//! The `impl FilesystemMT` block acts as the primary dispatcher, receiving
//! path-addressed calls from the `fuse_mt`/`fuser` kernel layer and
//! forwarding them to the appropriate sub-modules (`attr`, `dir`, `data`,
//! etc.) for processing.
use std::path::{Path, PathBuf};
use std::time::Duration;

use fuse_mt::{
    FilesystemMT, RequestInfo, ResultCreate, ResultData, ResultEmpty, ResultEntry, ResultOpen,
    ResultReaddir, ResultWrite, ResultXattr, Statfs,
};

use crate::backend::Backend;
use crate::routing::RoutingTable;

// --- Module Declarations ---
// These files contain the logic for handling individual operations.
pub mod prelude;
mod attr;
mod create;
mod data;
mod delete;
mod dir;
mod rename;
mod xattr;

/// Entries are never cached by this filesystem (see Non-goals); a TTL of
/// zero tells the kernel to revalidate on every lookup.
pub const ENTRY_TTL: Duration = Duration::from_secs(0);

/// Converts an `io::Error` into the `libc::c_int` the kernel expects.
pub fn ioerr(e: std::io::Error) -> libc::c_int {
    e.raw_os_error().unwrap_or(libc::EIO)
}

/// Strips the path's leading separator (fuse_mt paths are always
/// absolute), collapsing the bare root to `.` for `*at` addressing.
fn relativize(path: &Path) -> PathBuf {
    match path.strip_prefix("/") {
        Ok(p) if p.as_os_str().is_empty() => PathBuf::from("."),
        Ok(p) => p.to_path_buf(),
        Err(_) => path.to_path_buf(),
    }
}

/// Joins a relativized parent with a child name, without leaving a
/// literal `./` prefix when `parent` is the backend root. `Path::join`
/// alone would turn `.` + `name` into `./name`, which no longer matches
/// the routing table's plain string-prefix comparisons.
pub(crate) fn join_rel(parent: &Path, name: &std::ffi::OsStr) -> PathBuf {
    if parent.as_os_str().is_empty() || parent == Path::new(".") {
        PathBuf::from(name)
    } else {
        parent.join(name)
    }
}

/// The main state struct for the union filesystem.
///
/// Holds the two backend directory descriptors (opened once, before
/// mount) and the immutable routing table used to classify every
/// request path.
pub struct UnionFs {
    pub(crate) default_backend: Backend,
    pub(crate) alternate_backend: Backend,
    pub(crate) routing: RoutingTable,
}

impl UnionFs {
    pub fn new(default_backend: Backend, alternate_backend: Backend, routing: RoutingTable) -> Self {
        Self {
            default_backend,
            alternate_backend,
            routing,
        }
    }

    /// Classifies `path` (already relative, leading `/` stripped) and
    /// returns the backend it routes to.
    pub(crate) fn backend_for(&self, rel: &Path) -> &Backend {
        let s = rel.to_string_lossy();
        if self.routing.is_alternate(s.as_ref()) {
            &self.alternate_backend
        } else {
            &self.default_backend
        }
    }
}

/// Main FUSE trait implementation.
///
/// This block acts as a simple "dispatcher" or "router". All kernel calls
/// land here, are normalized into a relative path once, and are
/// immediately forwarded to the appropriate function in one of the
/// sub-modules (e.g., `attr::getattr`).
#[cfg(test)]
mod relativize_tests {
    use super::*;

    #[test]
    fn relativize_strips_leading_slash() {
        assert_eq!(relativize(Path::new("/a/b")), PathBuf::from("a/b"));
        assert_eq!(relativize(Path::new("/")), PathBuf::from("."));
    }

    #[test]
    fn join_rel_avoids_dot_slash_prefix_at_root() {
        assert_eq!(
            join_rel(Path::new("."), std::ffi::OsStr::new("name")),
            PathBuf::from("name")
        );
        assert_eq!(
            join_rel(Path::new("sub"), std::ffi::OsStr::new("name")),
            PathBuf::from("sub/name")
        );
    }
}

impl FilesystemMT for UnionFs {
    fn init(&self, _req: RequestInfo) -> ResultEmpty {
        Ok(())
    }

    fn destroy(&self, _req: RequestInfo) {}

    fn getattr(&self, req: RequestInfo, path: &Path, fh: Option<u64>) -> ResultEntry {
        attr::getattr(self, req, &relativize(path), fh)
    }

    fn chmod(&self, req: RequestInfo, path: &Path, fh: Option<u64>, mode: u32) -> ResultEmpty {
        attr::chmod(self, req, &relativize(path), fh, mode)
    }

    fn chown(
        &self,
        req: RequestInfo,
        path: &Path,
        fh: Option<u64>,
        uid: Option<u32>,
        gid: Option<u32>,
    ) -> ResultEmpty {
        attr::chown(self, req, &relativize(path), fh, uid, gid)
    }

    fn truncate(&self, req: RequestInfo, path: &Path, fh: Option<u64>, size: u64) -> ResultEmpty {
        attr::truncate(self, req, &relativize(path), fh, size)
    }

    fn utimens(
        &self,
        req: RequestInfo,
        path: &Path,
        fh: Option<u64>,
        atime: Option<std::time::SystemTime>,
        mtime: Option<std::time::SystemTime>,
    ) -> ResultEmpty {
        attr::utimens(self, req, &relativize(path), fh, atime, mtime)
    }

    fn readlink(&self, req: RequestInfo, path: &Path) -> ResultData {
        dir::readlink(self, req, &relativize(path))
    }

    fn mknod(
        &self,
        req: RequestInfo,
        parent: &Path,
        name: &std::ffi::OsStr,
        mode: u32,
        rdev: u32,
    ) -> ResultEntry {
        create::mknod(self, req, &relativize(parent), name, mode, rdev)
    }

    fn mkdir(
        &self,
        req: RequestInfo,
        parent: &Path,
        name: &std::ffi::OsStr,
        mode: u32,
    ) -> ResultEntry {
        create::mkdir(self, req, &relativize(parent), name, mode)
    }

    fn unlink(&self, req: RequestInfo, parent: &Path, name: &std::ffi::OsStr) -> ResultEmpty {
        delete::unlink(self, req, &relativize(parent), name)
    }

    fn rmdir(&self, req: RequestInfo, parent: &Path, name: &std::ffi::OsStr) -> ResultEmpty {
        delete::rmdir(self, req, &relativize(parent), name)
    }

    fn symlink(
        &self,
        req: RequestInfo,
        parent: &Path,
        name: &std::ffi::OsStr,
        target: &Path,
    ) -> ResultEntry {
        create::symlink(self, req, &relativize(parent), name, target)
    }

    fn rename(
        &self,
        req: RequestInfo,
        parent: &Path,
        name: &std::ffi::OsStr,
        newparent: &Path,
        newname: &std::ffi::OsStr,
    ) -> ResultEmpty {
        rename::rename(
            self,
            req,
            &relativize(parent),
            name,
            &relativize(newparent),
            newname,
        )
    }

    fn link(
        &self,
        req: RequestInfo,
        path: &Path,
        newparent: &Path,
        newname: &std::ffi::OsStr,
    ) -> ResultEntry {
        create::link(self, req, &relativize(path), &relativize(newparent), newname)
    }

    fn open(&self, req: RequestInfo, path: &Path, flags: u32) -> ResultOpen {
        data::open(self, req, &relativize(path), flags)
    }

    fn read(
        &self,
        req: RequestInfo,
        path: &Path,
        fh: u64,
        offset: u64,
        size: u32,
        callback: impl FnOnce(fuse_mt::ResultSlice<'_>) -> fuse_mt::CallbackResult,
    ) -> fuse_mt::CallbackResult {
        data::read(self, req, &relativize(path), fh, offset, size, callback)
    }

    fn write(
        &self,
        req: RequestInfo,
        path: &Path,
        fh: u64,
        offset: u64,
        data_in: Vec<u8>,
        flags: u32,
    ) -> ResultWrite {
        data::write(self, req, &relativize(path), fh, offset, data_in, flags)
    }

    fn flush(&self, req: RequestInfo, path: &Path, fh: u64, lock_owner: u64) -> ResultEmpty {
        data::flush(self, req, &relativize(path), fh, lock_owner)
    }

    fn release(
        &self,
        req: RequestInfo,
        path: &Path,
        fh: u64,
        flags: u32,
        lock_owner: u64,
        flush: bool,
    ) -> ResultEmpty {
        data::release(self, req, &relativize(path), fh, flags, lock_owner, flush)
    }

    fn fsync(&self, req: RequestInfo, path: &Path, fh: u64, datasync: bool) -> ResultEmpty {
        data::fsync(self, req, &relativize(path), fh, datasync)
    }

    fn opendir(&self, req: RequestInfo, path: &Path, flags: u32) -> ResultOpen {
        dir::opendir(self, req, &relativize(path), flags)
    }

    fn readdir(&self, req: RequestInfo, path: &Path, fh: u64) -> ResultReaddir {
        dir::readdir(self, req, &relativize(path), fh)
    }

    fn releasedir(&self, req: RequestInfo, path: &Path, fh: u64, flags: u32) -> ResultEmpty {
        dir::releasedir(self, req, &relativize(path), fh, flags)
    }

    fn fsyncdir(&self, req: RequestInfo, path: &Path, fh: u64, datasync: bool) -> ResultEmpty {
        dir::fsyncdir(self, req, &relativize(path), fh, datasync)
    }

    fn statfs(&self, req: RequestInfo, path: &Path) -> Result<Statfs, libc::c_int> {
        dir::statfs(self, req, &relativize(path))
    }

    fn setxattr(
        &self,
        req: RequestInfo,
        path: &Path,
        name: &std::ffi::OsStr,
        value: &[u8],
        flags: u32,
        position: u32,
    ) -> ResultEmpty {
        xattr::setxattr(self, req, &relativize(path), name, value, flags, position)
    }

    fn getxattr(
        &self,
        req: RequestInfo,
        path: &Path,
        name: &std::ffi::OsStr,
        size: u32,
    ) -> ResultXattr {
        xattr::getxattr(self, req, &relativize(path), name, size)
    }

    fn listxattr(&self, req: RequestInfo, path: &Path, size: u32) -> ResultXattr {
        xattr::listxattr(self, req, &relativize(path), size)
    }

    fn removexattr(&self, req: RequestInfo, path: &Path, name: &std::ffi::OsStr) -> ResultEmpty {
        xattr::removexattr(self, req, &relativize(path), name)
    }

    fn access(&self, req: RequestInfo, path: &Path, mask: u32) -> ResultEmpty {
        attr::access(self, req, &relativize(path), mask)
    }

    fn create(
        &self,
        req: RequestInfo,
        parent: &Path,
        name: &std::ffi::OsStr,
        mode: u32,
        flags: u32,
    ) -> ResultCreate {
        create::create(self, req, &relativize(parent), name, mode, flags)
    }
}
