//! Per-request identity impersonation.
//!
//! The process starts privileged (root) so it can become any caller for
//! the duration of a single request. This is sound only because the
//! filesystem is served single-threaded (see `main::mount`): a second
//! request can never observe a partially-impersonated process.

use std::ffi::CString;
use std::io;

/// Sets the effective uid/gid — and the supplementary group list — to
/// the caller's for the lifetime of the guard, restoring root on drop.
///
/// Supplementary groups matter here: a caller's access to a
/// group-readable file depends on their full group list, not just their
/// primary gid, and `seteuid`/`setegid` alone never touch it.
pub struct Impersonation {
    restore: bool,
}

/// Looks up the caller's username via `getpwuid_r`, needed because
/// `initgroups(3)` takes a username, not a uid.
fn username_for(uid: libc::uid_t) -> io::Result<CString> {
    let mut buf = vec![0i8; 16384];
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::passwd = std::ptr::null_mut();
    let rc = unsafe {
        libc::getpwuid_r(
            uid,
            &mut pwd as *mut libc::passwd,
            buf.as_mut_ptr(),
            buf.len(),
            &mut result as *mut *mut libc::passwd,
        )
    };
    if rc != 0 || result.is_null() {
        return Err(io::Error::from_raw_os_error(if rc != 0 { rc } else { libc::ENOENT }));
    }
    let name = unsafe { std::ffi::CStr::from_ptr(pwd.pw_name) };
    Ok(name.to_owned())
}

impl Impersonation {
    pub fn enter(uid: u32, gid: u32) -> io::Result<Self> {
        if let Ok(name) = username_for(uid) {
            unsafe {
                libc::initgroups(name.as_ptr(), gid);
            }
        }

        unsafe {
            if libc::setegid(gid) != 0 {
                return Err(io::Error::last_os_error());
            }
            if libc::seteuid(uid) != 0 {
                let err = io::Error::last_os_error();
                libc::setegid(0);
                return Err(err);
            }
        }
        Ok(Self { restore: true })
    }
}

impl Drop for Impersonation {
    fn drop(&mut self) {
        if self.restore {
            unsafe {
                libc::seteuid(0);
                libc::setegid(0);
                let root_group: libc::gid_t = 0;
                libc::setgroups(1, &root_group as *const libc::gid_t);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_with_current_identity_succeeds_and_restores() {
        let uid = unsafe { libc::getuid() };
        let gid = unsafe { libc::getgid() };
        {
            let _guard = Impersonation::enter(uid, gid).unwrap();
            assert_eq!(unsafe { libc::geteuid() }, uid);
        }
    }
}
