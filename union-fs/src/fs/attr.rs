use super::prelude::*;
use std::time::{SystemTime, UNIX_EPOCH};

fn systime(sec: i64, nsec: i64) -> SystemTime {
    if sec >= 0 {
        UNIX_EPOCH + std::time::Duration::new(sec as u64, nsec as u32)
    } else {
        UNIX_EPOCH - std::time::Duration::new((-sec) as u64, 0)
    }
}

fn kind_of(mode: libc::mode_t) -> fuser::FileType {
    match mode & libc::S_IFMT {
        libc::S_IFDIR => fuser::FileType::Directory,
        libc::S_IFLNK => fuser::FileType::Symlink,
        libc::S_IFCHR => fuser::FileType::CharDevice,
        libc::S_IFBLK => fuser::FileType::BlockDevice,
        libc::S_IFIFO => fuser::FileType::NamedPipe,
        libc::S_IFSOCK => fuser::FileType::Socket,
        _ => fuser::FileType::RegularFile,
    }
}

/// Converts a raw `stat` result into the attribute struct `fuse_mt` wants.
/// There is no inode field: this filesystem is addressed by path.
pub(super) fn stat_to_attr(st: &libc::stat) -> FileAttr {
    FileAttr {
        size: st.st_size as u64,
        blocks: st.st_blocks as u64,
        atime: systime(st.st_atime, st.st_atime_nsec),
        mtime: systime(st.st_mtime, st.st_mtime_nsec),
        ctime: systime(st.st_ctime, st.st_ctime_nsec),
        crtime: UNIX_EPOCH,
        kind: kind_of(st.st_mode),
        perm: (st.st_mode & 0o7777) as u16,
        nlink: st.st_nlink as u32,
        uid: st.st_uid,
        gid: st.st_gid,
        rdev: st.st_rdev as u32,
        flags: 0,
    }
}

/// `fstat`s the raw descriptor directly. Used whenever the kernel
/// supplies a handle, so a stat on an open-but-unlinked file still
/// succeeds instead of re-resolving (and failing to find) the path.
fn fstat(fh: u64) -> std::io::Result<libc::stat> {
    let mut st: libc::stat = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::fstat(fh as libc::c_int, &mut st as *mut libc::stat) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(st)
}

pub fn getattr(fs: &UnionFs, req: RequestInfo, rel: &Path, fh: Option<u64>) -> ResultEntry {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let st = match fh {
        Some(fh) => fstat(fh).map_err(ioerr)?,
        None => fs.backend_for(rel).lstat(rel).map_err(ioerr)?,
    };
    Ok((ENTRY_TTL, stat_to_attr(&st)))
}

pub fn chmod(fs: &UnionFs, req: RequestInfo, rel: &Path, _fh: Option<u64>, mode: u32) -> ResultEmpty {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let backend = fs.backend_for(rel);
    backend.fchmodat(rel, mode as libc::mode_t).map_err(ioerr)
}

pub fn chown(
    fs: &UnionFs,
    req: RequestInfo,
    rel: &Path,
    _fh: Option<u64>,
    uid: Option<u32>,
    gid: Option<u32>,
) -> ResultEmpty {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let backend = fs.backend_for(rel);
    let st = backend.lstat(rel).map_err(ioerr)?;
    let new_uid = uid.unwrap_or(st.st_uid);
    let new_gid = gid.unwrap_or(st.st_gid);
    backend.fchownat(rel, new_uid, new_gid).map_err(ioerr)
}

pub fn truncate(fs: &UnionFs, req: RequestInfo, rel: &Path, fh: Option<u64>, size: u64) -> ResultEmpty {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    match fh {
        Some(fh) => {
            let rc = unsafe { libc::ftruncate(fh as libc::c_int, size as i64) };
            if rc != 0 {
                return Err(std::io::Error::last_os_error()
                    .raw_os_error()
                    .unwrap_or(libc::EIO));
            }
            Ok(())
        }
        None => fs.backend_for(rel).truncate_rel(rel, size as i64).map_err(ioerr),
    }
}

pub fn utimens(
    fs: &UnionFs,
    req: RequestInfo,
    rel: &Path,
    _fh: Option<u64>,
    atime: Option<SystemTime>,
    mtime: Option<SystemTime>,
) -> ResultEmpty {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let backend = fs.backend_for(rel);

    let to_spec = |t: Option<SystemTime>| -> libc::timespec {
        match t {
            None => libc::timespec {
                tv_sec: 0,
                tv_nsec: libc::UTIME_OMIT,
            },
            Some(t) => match t.duration_since(UNIX_EPOCH) {
                Ok(d) => libc::timespec {
                    tv_sec: d.as_secs() as libc::time_t,
                    tv_nsec: d.subsec_nanos() as i64,
                },
                Err(_) => libc::timespec {
                    tv_sec: 0,
                    tv_nsec: libc::UTIME_NOW,
                },
            },
        }
    };

    let times = [to_spec(atime), to_spec(mtime)];
    backend.utimensat(rel, &times).map_err(ioerr)
}

/// Checks access against the impersonated caller's *effective* identity
/// (`AT_EACCESS`) — plain `access(2)` checks the real uid/gid, which
/// would still be root here since impersonation only changes the
/// effective ids.
pub fn access(fs: &UnionFs, req: RequestInfo, rel: &Path, mask: u32) -> ResultEmpty {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let backend = fs.backend_for(rel);
    backend.faccessat_eaccess(rel, mask as i32).map_err(ioerr)
}
