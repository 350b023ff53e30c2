use super::prelude::*;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;

/// Linux has no directory-relative (`*at`) extended-attribute syscalls, so
/// these four operations address the backend through the
/// `/proc/self/fd/<fd>/<relpath>` indirection instead, keeping
/// symlink-non-following (`l*xattr`) semantics without mutating the
/// process's working directory.
fn proc_cpath(fs: &UnionFs, rel: &Path) -> Result<CString, libc::c_int> {
    let backend = fs.backend_for(rel);
    let p = backend.proc_path(rel);
    CString::new(p.as_os_str().as_bytes()).map_err(|_| libc::EINVAL)
}

pub fn setxattr(
    fs: &UnionFs,
    req: RequestInfo,
    rel: &Path,
    name: &OsStr,
    value: &[u8],
    flags: u32,
    _position: u32,
) -> ResultEmpty {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let path_c = proc_cpath(fs, rel)?;
    let name_c = CString::new(name.as_bytes()).map_err(|_| libc::EINVAL)?;
    let rc = unsafe {
        libc::lsetxattr(
            path_c.as_ptr(),
            name_c.as_ptr(),
            value.as_ptr() as *const libc::c_void,
            value.len(),
            flags as libc::c_int,
        )
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(libc::EIO));
    }
    Ok(())
}

pub fn getxattr(fs: &UnionFs, req: RequestInfo, rel: &Path, name: &OsStr, size: u32) -> ResultXattr {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let path_c = proc_cpath(fs, rel)?;
    let name_c = CString::new(name.as_bytes()).map_err(|_| libc::EINVAL)?;

    if size == 0 {
        let n = unsafe {
            libc::lgetxattr(path_c.as_ptr(), name_c.as_ptr(), std::ptr::null_mut(), 0)
        };
        if n < 0 {
            return Err(std::io::Error::last_os_error()
                .raw_os_error()
                .unwrap_or(libc::EIO));
        }
        return Ok(Xattr::Size(n as u32));
    }

    let mut buf = vec![0u8; size as usize];
    let n = unsafe {
        libc::lgetxattr(
            path_c.as_ptr(),
            name_c.as_ptr(),
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
        )
    };
    if n < 0 {
        return Err(std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(libc::EIO));
    }
    buf.truncate(n as usize);
    Ok(Xattr::Data(buf))
}

pub fn listxattr(fs: &UnionFs, req: RequestInfo, rel: &Path, size: u32) -> ResultXattr {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let path_c = proc_cpath(fs, rel)?;

    if size == 0 {
        let n = unsafe { libc::llistxattr(path_c.as_ptr(), std::ptr::null_mut(), 0) };
        if n < 0 {
            return Err(std::io::Error::last_os_error()
                .raw_os_error()
                .unwrap_or(libc::EIO));
        }
        return Ok(Xattr::Size(n as u32));
    }

    let mut buf = vec![0u8; size as usize];
    let n = unsafe {
        libc::llistxattr(path_c.as_ptr(), buf.as_mut_ptr() as *mut libc::c_char, buf.len())
    };
    if n < 0 {
        return Err(std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(libc::EIO));
    }
    buf.truncate(n as usize);
    Ok(Xattr::Data(buf))
}

pub fn removexattr(fs: &UnionFs, req: RequestInfo, rel: &Path, name: &OsStr) -> ResultEmpty {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let path_c = proc_cpath(fs, rel)?;
    let name_c = CString::new(name.as_bytes()).map_err(|_| libc::EINVAL)?;
    let rc = unsafe { libc::lremovexattr(path_c.as_ptr(), name_c.as_ptr()) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(libc::EIO));
    }
    Ok(())
}
