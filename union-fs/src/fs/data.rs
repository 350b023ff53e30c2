use super::prelude::*;

/// Opens a file. The chosen backend's raw descriptor *is* the handle
/// returned to the kernel: all subsequent operations on this `fh` use
/// `pread`/`pwrite`/`fsync` directly on that descriptor and never
/// re-classify the path, which is what makes the handle "sticky".
pub fn open(fs: &UnionFs, req: RequestInfo, rel: &Path, flags: u32) -> ResultOpen {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let backend = fs.backend_for(rel);
    let fd = backend.openat(rel, flags as i32, 0).map_err(ioerr)?;
    Ok((fd as u64, flags))
}

/// Reads from an open handle via `pread`, positionally, without needing
/// to know which backend the descriptor belongs to.
pub fn read(
    _fs: &UnionFs,
    _req: RequestInfo,
    _rel: &Path,
    fh: u64,
    offset: u64,
    size: u32,
    callback: impl FnOnce(ResultSlice<'_>) -> CallbackResult,
) -> CallbackResult {
    let mut buf = vec![0u8; size as usize];
    let n = unsafe {
        libc::pread(
            fh as libc::c_int,
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
            offset as libc::off_t,
        )
    };
    if n < 0 {
        return callback(Err(std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(libc::EIO)));
    }
    buf.truncate(n as usize);
    callback(Ok(&buf))
}

pub fn write(
    _fs: &UnionFs,
    _req: RequestInfo,
    _rel: &Path,
    fh: u64,
    offset: u64,
    data: Vec<u8>,
    _flags: u32,
) -> ResultWrite {
    let n = unsafe {
        libc::pwrite(
            fh as libc::c_int,
            data.as_ptr() as *const libc::c_void,
            data.len(),
            offset as libc::off_t,
        )
    };
    if n < 0 {
        return Err(std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(libc::EIO));
    }
    Ok(n as u32)
}

pub fn flush(_fs: &UnionFs, _req: RequestInfo, _rel: &Path, _fh: u64, _lock_owner: u64) -> ResultEmpty {
    Ok(())
}

/// Closes the sticky handle. Called once per `open`/`create`; subsequent
/// calls with the same `fh` never occur once this returns.
pub fn release(
    _fs: &UnionFs,
    _req: RequestInfo,
    _rel: &Path,
    fh: u64,
    _flags: u32,
    _lock_owner: u64,
    _flush: bool,
) -> ResultEmpty {
    let rc = unsafe { libc::close(fh as libc::c_int) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(libc::EIO));
    }
    Ok(())
}

pub fn fsync(_fs: &UnionFs, _req: RequestInfo, _rel: &Path, fh: u64, datasync: bool) -> ResultEmpty {
    let rc = if datasync {
        unsafe { libc::fdatasync(fh as libc::c_int) }
    } else {
        unsafe { libc::fsync(fh as libc::c_int) }
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(libc::EIO));
    }
    Ok(())
}
