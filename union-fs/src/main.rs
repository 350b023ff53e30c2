mod backend;
mod errors;
mod fs;
mod identity;
mod routing;

use std::path::PathBuf;

use clap::Parser;
use fuse_mt::FuseMT;
use tracing::{error, info};

use backend::Backend;
use errors::StartupError;
use fs::UnionFs;
use routing::RoutingTable;

/// Mounts a union of two directories: a default backend (the directory
/// being covered) and an alternate backend, with a fixed set of relative
/// paths routed to the alternate.
#[derive(Parser, Debug)]
#[command(name = "union-fs", version, about)]
struct Args {
    /// Directory to mount the union filesystem onto.
    mountpoint: PathBuf,

    /// The alternate backend directory.
    alternate_dir: PathBuf,

    /// Relative paths routed to the alternate backend. Must not begin or
    /// end with '/'.
    alternate_paths: Vec<String>,
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    if unsafe { libc::geteuid() } != 0 {
        return Err(StartupError::NotPrivileged.into());
    }

    let routing = RoutingTable::new(args.alternate_paths.clone()).map_err(|bad| {
        StartupError::InvalidAlternatePath(bad)
    })?;

    let default_backend = Backend::open(&args.mountpoint).map_err(|source| {
        StartupError::BackendUnavailable {
            path: args.mountpoint.clone(),
            source,
        }
    })?;
    let alternate_backend = Backend::open(&args.alternate_dir).map_err(|source| {
        StartupError::BackendUnavailable {
            path: args.alternate_dir.clone(),
            source,
        }
    })?;

    info!(
        mountpoint = %args.mountpoint.display(),
        alternate = %args.alternate_dir.display(),
        routes = args.alternate_paths.len(),
        "opened backends"
    );

    let fs = UnionFs::new(default_backend, alternate_backend, routing);

    // Single-threaded by construction: request identity impersonation
    // mutates process-wide effective uid/gid, which is only sound when
    // no second request can be in flight concurrently.
    let fuse_mt_fs = FuseMT::new(fs, 1);

    let options = [
        fuser::MountOption::FSName("unionfs".to_string()),
        fuser::MountOption::AllowOther,
        fuser::MountOption::CUSTOM("nonempty".to_string()),
    ];

    info!(mountpoint = %args.mountpoint.display(), "mounting in foreground");
    fuser::mount2(fuse_mt_fs, &args.mountpoint, &options)?;
    Ok(())
}

fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run() {
        error!("{e:#}");
        std::process::exit(1);
    }
}
