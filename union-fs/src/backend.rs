//! Backend directory descriptors and the `*at`-style syscalls issued
//! against them.
//!
//! Every operation addresses the backend positionally through its open
//! directory file descriptor rather than via `chdir`, so the dispatcher
//! never mutates process-wide working directory state.

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::path::Path;

/// An open directory that serves as one half of the union (default or
/// alternate). Opened once at startup and held for the process lifetime.
pub struct Backend {
    fd: RawFd,
}

fn cpath(path: &Path) -> io::Result<CString> {
    let rel = if path.as_os_str().is_empty() {
        CString::new(".").unwrap()
    } else {
        CString::new(path.as_os_str().as_bytes())
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?
    };
    Ok(rel)
}

fn last_error() -> io::Error {
    io::Error::last_os_error()
}

impl Backend {
    /// Opens `path` as a directory descriptor, to be held for the life of
    /// the process.
    pub fn open(path: &Path) -> io::Result<Self> {
        let c = cpath(path)?;
        let fd = unsafe { libc::open(c.as_ptr(), libc::O_DIRECTORY | libc::O_RDONLY) };
        if fd < 0 {
            return Err(last_error());
        }
        Ok(Self { fd })
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.fd
    }

    pub fn lstat(&self, rel: &Path) -> io::Result<libc::stat> {
        let c = cpath(rel)?;
        let mut st: libc::stat = unsafe { std::mem::zeroed() };
        let rc = unsafe {
            libc::fstatat(
                self.fd,
                c.as_ptr(),
                &mut st as *mut libc::stat,
                libc::AT_SYMLINK_NOFOLLOW,
            )
        };
        if rc != 0 {
            return Err(last_error());
        }
        Ok(st)
    }

    pub fn openat(&self, rel: &Path, flags: i32, mode: libc::mode_t) -> io::Result<RawFd> {
        let c = cpath(rel)?;
        let fd = unsafe { libc::openat(self.fd, c.as_ptr(), flags, mode as libc::c_uint) };
        if fd < 0 {
            return Err(last_error());
        }
        Ok(fd)
    }

    pub fn mkdirat(&self, rel: &Path, mode: libc::mode_t) -> io::Result<()> {
        let c = cpath(rel)?;
        let rc = unsafe { libc::mkdirat(self.fd, c.as_ptr(), mode) };
        if rc != 0 {
            return Err(last_error());
        }
        Ok(())
    }

    pub fn mknodat(&self, rel: &Path, mode: libc::mode_t, dev: libc::dev_t) -> io::Result<()> {
        let c = cpath(rel)?;
        let rc = unsafe { libc::mknodat(self.fd, c.as_ptr(), mode, dev) };
        if rc != 0 {
            return Err(last_error());
        }
        Ok(())
    }

    pub fn unlinkat(&self, rel: &Path, dir: bool) -> io::Result<()> {
        let c = cpath(rel)?;
        let flags = if dir { libc::AT_REMOVEDIR } else { 0 };
        let rc = unsafe { libc::unlinkat(self.fd, c.as_ptr(), flags) };
        if rc != 0 {
            return Err(last_error());
        }
        Ok(())
    }

    pub fn symlinkat(&self, target: &Path, rel: &Path) -> io::Result<()> {
        let target_c = CString::new(target.as_os_str().as_bytes())
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        let rel_c = cpath(rel)?;
        let rc = unsafe { libc::symlinkat(target_c.as_ptr(), self.fd, rel_c.as_ptr()) };
        if rc != 0 {
            return Err(last_error());
        }
        Ok(())
    }

    pub fn readlinkat(&self, rel: &Path) -> io::Result<Vec<u8>> {
        let c = cpath(rel)?;
        let mut buf = vec![0u8; libc::PATH_MAX as usize];
        let n = unsafe {
            libc::readlinkat(
                self.fd,
                c.as_ptr(),
                buf.as_mut_ptr() as *mut libc::c_char,
                buf.len(),
            )
        };
        if n < 0 {
            return Err(last_error());
        }
        buf.truncate(n as usize);
        Ok(buf)
    }

    pub fn linkat(&self, rel: &Path, new_backend: &Backend, new_rel: &Path) -> io::Result<()> {
        let old_c = cpath(rel)?;
        let new_c = cpath(new_rel)?;
        let rc = unsafe {
            libc::linkat(
                self.fd,
                old_c.as_ptr(),
                new_backend.fd,
                new_c.as_ptr(),
                libc::AT_SYMLINK_FOLLOW,
            )
        };
        if rc != 0 {
            return Err(last_error());
        }
        Ok(())
    }

    pub fn renameat(&self, rel: &Path, new_backend: &Backend, new_rel: &Path) -> io::Result<()> {
        let old_c = cpath(rel)?;
        let new_c = cpath(new_rel)?;
        let rc = unsafe {
            libc::renameat(self.fd, old_c.as_ptr(), new_backend.fd, new_c.as_ptr())
        };
        if rc != 0 {
            return Err(last_error());
        }
        Ok(())
    }

    pub fn fchmodat(&self, rel: &Path, mode: libc::mode_t) -> io::Result<()> {
        let c = cpath(rel)?;
        let rc = unsafe {
            libc::fchmodat(self.fd, c.as_ptr(), mode, libc::AT_SYMLINK_NOFOLLOW)
        };
        if rc != 0 {
            return Err(last_error());
        }
        Ok(())
    }

    pub fn fchownat(&self, rel: &Path, uid: libc::uid_t, gid: libc::gid_t) -> io::Result<()> {
        let c = cpath(rel)?;
        let rc = unsafe {
            libc::fchownat(self.fd, c.as_ptr(), uid, gid, libc::AT_SYMLINK_NOFOLLOW)
        };
        if rc != 0 {
            return Err(last_error());
        }
        Ok(())
    }

    pub fn utimensat(&self, rel: &Path, times: &[libc::timespec; 2]) -> io::Result<()> {
        let c = cpath(rel)?;
        let rc = unsafe {
            libc::utimensat(self.fd, c.as_ptr(), times.as_ptr(), libc::AT_SYMLINK_NOFOLLOW)
        };
        if rc != 0 {
            return Err(last_error());
        }
        Ok(())
    }

    pub fn truncate_rel(&self, rel: &Path, size: i64) -> io::Result<()> {
        let fd = self.openat(rel, libc::O_WRONLY, 0)?;
        let rc = unsafe { libc::ftruncate(fd, size) };
        unsafe { libc::close(fd) };
        if rc != 0 {
            return Err(last_error());
        }
        Ok(())
    }

    /// Lists the immediate children of `rel` (a directory within this
    /// backend), via `openat` + `fdopendir` + `readdir` on the resulting
    /// descriptor, never touching the process's working directory.
    pub fn read_dir(&self, rel: &Path) -> io::Result<Vec<(std::ffi::OsString, u8)>> {
        let fd = self.openat(rel, libc::O_DIRECTORY | libc::O_RDONLY, 0)?;
        let dirp = unsafe { libc::fdopendir(fd) };
        if dirp.is_null() {
            unsafe { libc::close(fd) };
            return Err(last_error());
        }
        let mut out = Vec::new();
        loop {
            let entry = unsafe { libc::readdir(dirp) };
            if entry.is_null() {
                break;
            }
            let name_ptr = unsafe { (*entry).d_name.as_ptr() };
            let name = unsafe { std::ffi::CStr::from_ptr(name_ptr) };
            let bytes = name.to_bytes();
            if bytes == b"." || bytes == b".." {
                continue;
            }
            let d_type = unsafe { (*entry).d_type };
            out.push((
                std::ffi::OsStr::from_bytes(bytes).to_os_string(),
                d_type,
            ));
        }
        unsafe { libc::closedir(dirp) };
        Ok(out)
    }

    /// Checks access against the *effective* uid/gid (`AT_EACCESS`), not
    /// the real one — plain `access(2)`/`faccessat` without that flag
    /// ignores `seteuid`/`setegid` impersonation entirely.
    pub fn faccessat_eaccess(&self, rel: &Path, mode: i32) -> io::Result<()> {
        let c = cpath(rel)?;
        let rc = unsafe { libc::faccessat(self.fd, c.as_ptr(), mode, libc::AT_EACCESS) };
        if rc != 0 {
            return Err(last_error());
        }
        Ok(())
    }

    /// `/proc/self/fd/<fd>/<rel>` indirection, used only for the four
    /// extended-attribute syscalls, which have no `*at` form on Linux.
    pub fn proc_path(&self, rel: &Path) -> std::path::PathBuf {
        let mut p = std::path::PathBuf::from(format!("/proc/self/fd/{}", self.fd));
        if !rel.as_os_str().is_empty() && rel != Path::new(".") {
            p.push(rel);
        }
        p
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mkdir_create_and_read_dir_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = Backend::open(tmp.path()).unwrap();

        backend.mkdirat(Path::new("sub"), 0o755).unwrap();
        let fd = backend
            .openat(Path::new("sub/file.txt"), libc::O_CREAT | libc::O_WRONLY, 0o644)
            .unwrap();
        unsafe { libc::close(fd) };

        let mut children = backend
            .read_dir(Path::new("sub"))
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect::<Vec<_>>();
        children.sort();
        assert_eq!(children, vec![std::ffi::OsString::from("file.txt")]);
    }

    #[test]
    fn lstat_reports_created_file() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = Backend::open(tmp.path()).unwrap();
        let fd = backend
            .openat(Path::new("a"), libc::O_CREAT | libc::O_WRONLY, 0o600)
            .unwrap();
        unsafe { libc::close(fd) };

        let st = backend.lstat(Path::new("a")).unwrap();
        assert_eq!(st.st_mode & libc::S_IFMT, libc::S_IFREG);
    }

    #[test]
    fn unlinkat_removes_file_not_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = Backend::open(tmp.path()).unwrap();
        let fd = backend
            .openat(Path::new("a"), libc::O_CREAT | libc::O_WRONLY, 0o600)
            .unwrap();
        unsafe { libc::close(fd) };

        backend.unlinkat(Path::new("a"), false).unwrap();
        assert!(backend.lstat(Path::new("a")).is_err());
    }

    #[test]
    fn renameat_same_backend_moves_file() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = Backend::open(tmp.path()).unwrap();
        let fd = backend
            .openat(Path::new("old"), libc::O_CREAT | libc::O_WRONLY, 0o600)
            .unwrap();
        unsafe { libc::close(fd) };

        backend
            .renameat(Path::new("old"), &backend, Path::new("new"))
            .unwrap();
        assert!(backend.lstat(Path::new("old")).is_err());
        assert!(backend.lstat(Path::new("new")).is_ok());
    }
}
