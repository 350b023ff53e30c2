use super::prelude::*;

/// Handles `unlink` (e.g., `rm file.txt`): a direct `unlinkat` against the
/// backend the target classifies to.
pub fn unlink(fs: &UnionFs, req: RequestInfo, parent: &Path, name: &OsStr) -> ResultEmpty {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let rel = join_rel(parent, name);
    fs.backend_for(&rel).unlinkat(&rel, false).map_err(ioerr)
}

/// Handles `rmdir`: a direct `unlinkat` with `AT_REMOVEDIR`. The kernel
/// has already verified the directory is empty by the time this is
/// called; this dispatcher does not re-check.
pub fn rmdir(fs: &UnionFs, req: RequestInfo, parent: &Path, name: &OsStr) -> ResultEmpty {
    let _id = Impersonation::enter(req.uid, req.gid).map_err(ioerr)?;
    let rel = join_rel(parent, name);
    fs.backend_for(&rel).unlinkat(&rel, true).map_err(ioerr)
}
