//! Command resolution and process replacement.

use std::ffi::CString;
use std::path::Path;

use nix::unistd::execvp;

use crate::errors::SwitchError;

/// Chooses the command to run: an explicit argv beats `$SHELL` (if it
/// resolves inside the new root) beats `/bin/sh`.
pub fn resolve_command(explicit: &[String]) -> Vec<String> {
    if !explicit.is_empty() {
        return explicit.to_vec();
    }

    if let Ok(shell) = std::env::var("SHELL") {
        if Path::new(&shell).metadata().is_ok() {
            return vec![shell];
        }
    }

    vec!["/bin/sh".to_string()]
}

/// Replaces the process image. On success this never returns.
pub fn exec(cmd: &[String]) -> Result<(), SwitchError> {
    let program = CString::new(cmd[0].as_bytes()).map_err(|_| {
        SwitchError::ExecFailed(
            Path::new(&cmd[0]).to_path_buf(),
            std::io::Error::from(std::io::ErrorKind::InvalidInput),
        )
    })?;
    let args: Vec<CString> = cmd
        .iter()
        .map(|a| CString::new(a.as_bytes()).unwrap())
        .collect();

    match execvp(&program, &args) {
        Ok(_) => unreachable!("execvp replaces the process image on success"),
        Err(errno) => Err(SwitchError::ExecFailed(
            Path::new(&cmd[0]).to_path_buf(),
            std::io::Error::from_raw_os_error(errno as i32),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test function, not three: `$SHELL` is process-global state, so
    // exercising it from concurrently-run tests would race.
    #[test]
    fn resolve_command_precedence() {
        let explicit = resolve_command(&["/bin/ls".to_string(), "-la".to_string()]);
        assert_eq!(explicit, vec!["/bin/ls".to_string(), "-la".to_string()]);

        std::env::set_var("SHELL", "/bin/sh");
        assert_eq!(resolve_command(&[]), vec!["/bin/sh".to_string()]);

        std::env::set_var("SHELL", "/does/not/exist/shell");
        assert_eq!(resolve_command(&[]), vec!["/bin/sh".to_string()]);
    }
}
