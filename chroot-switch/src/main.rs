mod capability;
mod client;
mod errors;
mod escape;
mod exec;

use clap::Parser;
use tracing::{error, info};

use client::PID1_ALIAS;
use errors::SwitchError;

/// Escapes any chroot jail the caller is already in, enters the named
/// client's root filesystem, and execs a command there.
#[derive(Parser, Debug)]
#[command(name = "chroot-switch", version, about)]
struct Args {
    /// Name of the client to switch into ("pid1" is a reserved alias for
    /// the real root's own client).
    client: String,

    /// Command and arguments to run inside the client. Defaults to
    /// $SHELL, falling back to /bin/sh.
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

fn run() -> Result<(), SwitchError> {
    let args = Args::parse();

    let client_path = client::client_root_path(&args.client);
    let config_path = client::config_path(&args.client);
    let cwd = client::capture_cwd();

    capability::ensure_cap_sys_chroot()?;

    if args.client != PID1_ALIAS {
        client::ensure_config_secure(&config_path)?;
    }

    escape::break_out_of_chroot()?;

    let real_root = nix::sys::stat::lstat(".")?;
    let is_pid1 = args.client == PID1_ALIAS;
    let already_at_client = match nix::sys::stat::lstat(&client_path) {
        Ok(st) => st.st_dev == real_root.st_dev && st.st_ino == real_root.st_ino,
        Err(_) => false,
    };

    if !is_pid1 && !already_at_client {
        nix::unistd::chdir(&client_path)
            .map_err(|_| SwitchError::ClientUnavailable(client_path.clone()))?;
    }

    nix::unistd::chroot(".")?;

    client::restore_cwd(&cwd);

    let cmd = exec::resolve_command(&args.command);
    info!(client = %args.client, command = ?cmd, "executing");
    exec::exec(&cmd)
}

fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run() {
        error!("{e}");
        std::process::exit(1);
    }
}
