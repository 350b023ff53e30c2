use super::attr::stat_to_attr;
use super::prelude::*;

/// Handles the `create` operation (e.g., `touch file.txt` or `> file.txt`).
///
/// Classifies `parent/name`, impersonates the caller, and issues an
/// `openat` with `O_CREAT` ORed into the kernel-supplied flags against
/// the chosen backend. The raw file descriptor becomes the handle
/// returned to the kernel — the backend choice is now sticky for the
/// handle's lifetime.
pub fn create(
    fs: &UnionFs,
    req: RequestInfo,
    parent: &Path,
    name: &OsStr,
    mode: u32,
    flags: u32,
) -> ResultCreate {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let rel = join_rel(parent, name);
    let backend = fs.backend_for(&rel);

    let open_flags = (flags as i32) | libc::O_CREAT;
    let fd = backend
        .openat(&rel, open_flags, mode as libc::mode_t)
        .map_err(ioerr)?;

    let st = backend.lstat(&rel).map_err(ioerr)?;
    Ok(CreatedEntry {
        ttl: ENTRY_TTL,
        attr: stat_to_attr(&st),
        fh: fd as u64,
        flags,
    })
}

/// Handles `mknod` — special files (fifos, device nodes, regular files
/// created by `mknod(2)`).
pub fn mknod(
    fs: &UnionFs,
    req: RequestInfo,
    parent: &Path,
    name: &OsStr,
    mode: u32,
    rdev: u32,
) -> ResultEntry {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let rel = join_rel(parent, name);
    let backend = fs.backend_for(&rel);
    backend
        .mknodat(&rel, mode as libc::mode_t, rdev as libc::dev_t)
        .map_err(ioerr)?;
    let st = backend.lstat(&rel).map_err(ioerr)?;
    Ok((ENTRY_TTL, stat_to_attr(&st)))
}

/// Handles the `mkdir` operation (e.g., `mkdir my_dir`).
///
/// Routes by the *new* path, not the parent alone: a directory created
/// under an alternate-routed parent is itself alternate.
pub fn mkdir(fs: &UnionFs, req: RequestInfo, parent: &Path, name: &OsStr, mode: u32) -> ResultEntry {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let rel = join_rel(parent, name);
    let backend = fs.backend_for(&rel);
    backend.mkdirat(&rel, mode as libc::mode_t).map_err(ioerr)?;
    let st = backend.lstat(&rel).map_err(ioerr)?;
    Ok((ENTRY_TTL, stat_to_attr(&st)))
}

/// Handles `symlink`. The target string is stored verbatim, never
/// interpreted or rewritten.
pub fn symlink(
    fs: &UnionFs,
    req: RequestInfo,
    parent: &Path,
    name: &OsStr,
    target: &Path,
) -> ResultEntry {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let rel = join_rel(parent, name);
    let backend = fs.backend_for(&rel);
    backend.symlinkat(target, &rel).map_err(ioerr)?;
    let st = backend.lstat(&rel).map_err(ioerr)?;
    Ok((ENTRY_TTL, stat_to_attr(&st)))
}

/// Handles `link` (hardlink). Both source and destination must classify
/// to the *same* backend — a hardlink cannot span backends, since they
/// are different real filesystems.
pub fn link(fs: &UnionFs, req: RequestInfo, path: &Path, newparent: &Path, newname: &OsStr) -> ResultEntry {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let new_rel = join_rel(newparent, newname);
    let src_backend = fs.backend_for(path);
    let dst_backend = fs.backend_for(&new_rel);
    src_backend
        .linkat(path, dst_backend, &new_rel)
        .map_err(ioerr)?;
    let st = dst_backend.lstat(&new_rel).map_err(ioerr)?;
    Ok((ENTRY_TTL, stat_to_attr(&st)))
}
