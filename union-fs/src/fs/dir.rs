use super::prelude::*;
use std::os::unix::ffi::OsStrExt;

/// Handles `readlink`. The raw `readlinkat` does not null-terminate its
/// output and truncates silently at the buffer size; the caller-visible
/// contract here only needs the clamped byte slice itself.
pub fn readlink(fs: &UnionFs, req: RequestInfo, rel: &Path) -> ResultData {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let backend = fs.backend_for(rel);
    backend.readlinkat(rel).map_err(ioerr)
}

/// Opens a directory. Both backends are pre-opened for the whole process,
/// so this only needs to validate the path resolves in at least one of
/// them; the actual fd bookkeeping used by `readdir` is done per-call
/// against `fs`'s own backend descriptors (see `UnionFs::backend_for`),
/// not duplicated into the handle.
pub fn opendir(fs: &UnionFs, req: RequestInfo, rel: &Path, _flags: u32) -> ResultOpen {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let default_ok = fs.default_backend.lstat(rel).is_ok();
    let alt_ok = fs.alternate_backend.lstat(rel).is_ok();
    if !default_ok && !alt_ok {
        return Err(libc::ENOENT);
    }
    Ok((0, 0))
}

/// Produces the union of the two backends' children for `rel`.
///
/// A child is included from the alternate backend iff its full path
/// classifies as alternate; a child is included from the default backend
/// iff its full path does *not* classify as alternate. This guarantees
/// each name is emitted from exactly one backend, determined by routing,
/// never by which backend happened to enumerate it first.
pub fn readdir(fs: &UnionFs, req: RequestInfo, rel: &Path, _fh: u64) -> ResultReaddir {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;

    let mut out = vec![
        DirectoryEntry {
            name: ".".into(),
            kind: fuser::FileType::Directory,
        },
        DirectoryEntry {
            name: "..".into(),
            kind: fuser::FileType::Directory,
        },
    ];

    let mut any_backend_opened = false;

    if let Ok(children) = fs.alternate_backend.read_dir(rel) {
        any_backend_opened = true;
        for (name, d_type) in children {
            let child_rel = join_rel(rel, &name);
            let child_str = child_rel.to_string_lossy();
            if fs.routing.is_alternate(child_str.as_ref()) {
                out.push(DirectoryEntry {
                    name,
                    kind: file_type_from_dtype(d_type),
                });
            }
        }
    }

    if let Ok(children) = fs.default_backend.read_dir(rel) {
        any_backend_opened = true;
        for (name, d_type) in children {
            let child_rel = join_rel(rel, &name);
            let child_str = child_rel.to_string_lossy();
            if !fs.routing.is_alternate(child_str.as_ref()) {
                out.push(DirectoryEntry {
                    name,
                    kind: file_type_from_dtype(d_type),
                });
            }
        }
    }

    if !any_backend_opened {
        return Err(libc::ENOENT);
    }

    Ok(out)
}

fn file_type_from_dtype(d_type: u8) -> fuser::FileType {
    match d_type {
        libc::DT_DIR => fuser::FileType::Directory,
        libc::DT_LNK => fuser::FileType::Symlink,
        libc::DT_CHR => fuser::FileType::CharDevice,
        libc::DT_BLK => fuser::FileType::BlockDevice,
        libc::DT_FIFO => fuser::FileType::NamedPipe,
        libc::DT_SOCK => fuser::FileType::Socket,
        _ => fuser::FileType::RegularFile,
    }
}

pub fn releasedir(_fs: &UnionFs, _req: RequestInfo, _rel: &Path, _fh: u64, _flags: u32) -> ResultEmpty {
    Ok(())
}

pub fn fsyncdir(fs: &UnionFs, req: RequestInfo, rel: &Path, _fh: u64, _datasync: bool) -> ResultEmpty {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let backend = fs.backend_for(rel);
    let fd = backend
        .openat(rel, libc::O_DIRECTORY | libc::O_RDONLY, 0)
        .map_err(ioerr)?;
    let rc = unsafe { libc::fsync(fd) };
    unsafe { libc::close(fd) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(libc::EIO));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::routing::RoutingTable;

    fn caller() -> RequestInfo {
        RequestInfo {
            unique: 0,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
            pid: 0,
        }
    }

    #[test]
    fn readdir_unions_each_name_from_exactly_one_backend() {
        let default_dir = tempfile::tempdir().unwrap();
        let alt_dir = tempfile::tempdir().unwrap();

        std::fs::write(default_dir.path().join("kept.txt"), b"").unwrap();
        std::fs::write(default_dir.path().join("shadowed"), b"default").unwrap();
        std::fs::write(alt_dir.path().join("shadowed"), b"alternate").unwrap();
        std::fs::write(alt_dir.path().join("only-alt"), b"").unwrap();

        let default_backend = Backend::open(default_dir.path()).unwrap();
        let alternate_backend = Backend::open(alt_dir.path()).unwrap();
        let routing = RoutingTable::new(vec!["shadowed".into(), "only-alt".into()]).unwrap();
        let fs = UnionFs::new(default_backend, alternate_backend, routing);

        let entries = readdir(&fs, caller(), Path::new("."), 0).unwrap();
        let mut names: Vec<String> = entries
            .into_iter()
            .map(|e| e.name.to_string_lossy().into_owned())
            .filter(|n| n != "." && n != "..")
            .collect();
        names.sort();

        assert_eq!(names, vec!["kept.txt", "only-alt", "shadowed"]);
    }

    #[test]
    fn readdir_missing_in_both_backends_is_enoent() {
        let default_dir = tempfile::tempdir().unwrap();
        let alt_dir = tempfile::tempdir().unwrap();
        let default_backend = Backend::open(default_dir.path()).unwrap();
        let alternate_backend = Backend::open(alt_dir.path()).unwrap();
        let routing = RoutingTable::new(vec![]).unwrap();
        let fs = UnionFs::new(default_backend, alternate_backend, routing);

        let err = readdir(&fs, caller(), Path::new("missing"), 0).unwrap_err();
        assert_eq!(err, libc::ENOENT);
    }
}

pub fn statfs(fs: &UnionFs, req: RequestInfo, rel: &Path) -> Result<Statfs, libc::c_int> {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let backend = fs.backend_for(rel);
    let proc_path = backend.proc_path(rel);
    let c = std::ffi::CString::new(proc_path.as_os_str().as_bytes()).map_err(|_| libc::EINVAL)?;
    let mut st: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c.as_ptr(), &mut st as *mut libc::statvfs) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(libc::EIO));
    }
    Ok(Statfs {
        blocks: st.f_blocks as u64,
        bfree: st.f_bfree as u64,
        bavail: st.f_bavail as u64,
        files: st.f_files as u64,
        ffree: st.f_ffree as u64,
        bsize: st.f_bsize as u32,
        namelen: st.f_namemax as u32,
        frsize: st.f_frsize as u32,
    })
}
