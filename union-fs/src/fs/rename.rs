use super::prelude::*;
use std::io::{Read, Write};
use std::os::unix::ffi::OsStringExt;
use std::os::unix::io::FromRawFd;

use crate::backend::Backend;

const COPY_BUF_SIZE: usize = 8192;

/// Handles `rename` (e.g., `mv old.txt dir/new.txt`).
///
/// Source and destination are classified independently. When both route
/// to the same backend this is a single atomic `renameat`. When they
/// route to different backends (one alternate, one default) the kernel's
/// rename fails cross-device, and this function falls back to a
/// non-atomic copy-then-unlink, surfacing the copy phase's actual I/O
/// error rather than the original cross-device failure.
pub fn rename(
    fs: &UnionFs,
    req: RequestInfo,
    parent: &Path,
    name: &OsStr,
    newparent: &Path,
    newname: &OsStr,
) -> ResultEmpty {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;

    let old_rel = join_rel(parent, name);
    let new_rel = join_rel(newparent, newname);
    let src = fs.backend_for(&old_rel);
    let dst = fs.backend_for(&new_rel);

    match src.renameat(&old_rel, dst, &new_rel) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(libc::EXDEV) => {
            cross_backend_copy(src, &old_rel, dst, &new_rel).map_err(ioerr)
        }
        Err(e) => Err(ioerr(e)),
    }
}

/// Non-atomic fallback for a rename whose endpoints live on different
/// backends. A concurrent observer may see both, neither, or a partial
/// destination while this runs.
///
/// Dispatches on the source's file type: a symlink is recreated verbatim
/// via `readlinkat`/`symlinkat` rather than opened (opening it would
/// follow the link and copy the *target's* contents instead), and other
/// special files (fifos, device nodes, sockets) are recreated with
/// `mknodat` rather than opened, since opening a fifo can block
/// indefinitely and a socket cannot be `open`ed at all. Only regular
/// files are copied byte-for-byte.
fn cross_backend_copy(
    src: &Backend,
    old_rel: &Path,
    dst: &Backend,
    new_rel: &Path,
) -> std::io::Result<()> {
    let _ = dst.unlinkat(new_rel, false);

    let st = src.lstat(old_rel)?;
    let mode = (st.st_mode & 0o7777) as libc::mode_t;

    match st.st_mode & libc::S_IFMT {
        libc::S_IFLNK => {
            let target = src.readlinkat(old_rel)?;
            let target_path = std::path::PathBuf::from(std::ffi::OsString::from_vec(target));
            dst.symlinkat(&target_path, new_rel)?;
        }
        libc::S_IFREG => {
            let src_fd = src.openat(old_rel, libc::O_RDONLY, 0)?;
            let mut src_file = unsafe { std::fs::File::from_raw_fd(src_fd) };

            let dst_fd = dst.openat(
                new_rel,
                libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
                mode,
            )?;
            let mut dst_file = unsafe { std::fs::File::from_raw_fd(dst_fd) };

            let mut buf = [0u8; COPY_BUF_SIZE];
            loop {
                let n = src_file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                dst_file.write_all(&buf[..n])?;
            }
        }
        _ => {
            dst.mknodat(new_rel, st.st_mode as libc::mode_t, st.st_rdev)?;
        }
    }

    src.unlinkat(old_rel, false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RoutingTable;
    use std::io::Write as _;

    fn caller() -> RequestInfo {
        RequestInfo {
            unique: 0,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
            pid: 0,
        }
    }

    #[test]
    fn same_backend_rename_is_direct() {
        let tmp = tempfile::tempdir().unwrap();
        let default_backend = Backend::open(tmp.path()).unwrap();
        let alt_dir = tempfile::tempdir().unwrap();
        let alternate_backend = Backend::open(alt_dir.path()).unwrap();
        let routing = RoutingTable::new(vec!["alt".into()]).unwrap();

        std::fs::write(tmp.path().join("old"), b"hi").unwrap();
        let fs = UnionFs::new(default_backend, alternate_backend, routing);

        rename(
            &fs,
            caller(),
            Path::new("."),
            OsStr::new("old"),
            Path::new("."),
            OsStr::new("new"),
        )
        .unwrap();

        assert!(!tmp.path().join("old").exists());
        assert_eq!(std::fs::read(tmp.path().join("new")).unwrap(), b"hi");
    }

    #[test]
    fn cross_backend_rename_copies_and_removes_source() {
        let default_dir = tempfile::tempdir().unwrap();
        let alt_dir = tempfile::tempdir().unwrap();
        let default_backend = Backend::open(default_dir.path()).unwrap();
        let alternate_backend = Backend::open(alt_dir.path()).unwrap();
        let routing = RoutingTable::new(vec!["dst.txt".into()]).unwrap();

        let mut f = std::fs::File::create(default_dir.path().join("src.txt")).unwrap();
        f.write_all(b"payload").unwrap();
        drop(f);

        let fs = UnionFs::new(default_backend, alternate_backend, routing);

        rename(
            &fs,
            caller(),
            Path::new("."),
            OsStr::new("src.txt"),
            Path::new("."),
            OsStr::new("dst.txt"),
        )
        .unwrap();

        assert!(!default_dir.path().join("src.txt").exists());
        assert_eq!(
            std::fs::read(alt_dir.path().join("dst.txt")).unwrap(),
            b"payload"
        );
    }

    #[test]
    fn cross_backend_rename_preserves_symlink_instead_of_following_it() {
        let default_dir = tempfile::tempdir().unwrap();
        let alt_dir = tempfile::tempdir().unwrap();
        let default_backend = Backend::open(default_dir.path()).unwrap();
        let alternate_backend = Backend::open(alt_dir.path()).unwrap();
        let routing = RoutingTable::new(vec!["dst-link".into()]).unwrap();

        std::os::unix::fs::symlink("/some/target", default_dir.path().join("src-link")).unwrap();
        let fs = UnionFs::new(default_backend, alternate_backend, routing);

        rename(
            &fs,
            caller(),
            Path::new("."),
            OsStr::new("src-link"),
            Path::new("."),
            OsStr::new("dst-link"),
        )
        .unwrap();

        let dst = alt_dir.path().join("dst-link");
        let meta = std::fs::symlink_metadata(&dst).unwrap();
        assert!(meta.file_type().is_symlink());
        assert_eq!(std::fs::read_link(&dst).unwrap(), Path::new("/some/target"));
    }
}
