//! archivefs - Browse archive files as directories
//!
//! Usage:
//!   archivefs <source_dir> <mount_point>
//!
//! Mounts a read-only view of `source_dir` on `mount_point` in which every
//! archive file is also visible as a directory (`photos.zip` ->
//! `photos_zip`). Nothing can be written through the mount.

use archivefs::{config::Config, fs::ArchiveFs, fs::ArchiveView, Error, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "archivefs")]
#[command(author = "archivefs Contributors")]
#[command(version)]
#[command(about = "Transparently explore archive files as directories")]
struct Cli {
    /// Directory to expose
    source_dir: PathBuf,

    /// Where to mount the read-only view
    mount_point: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Allow other users to access the mount
    #[arg(long, conflicts_with = "allow_root")]
    allow_other: bool,

    /// Allow root to access the mount
    #[arg(long)]
    allow_root: bool,
}

fn main() {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set up logging: {}", e);
    }

    if let Err(e) = run(cli) {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };

    config.source_dir = canonical_source(&cli.source_dir)?;
    config.mount_point = cli.mount_point;
    if cli.allow_other {
        config.mount.allow_other = true;
    }
    if cli.allow_root {
        config.mount.allow_root = true;
    }
    config.validate()?;

    if !config.mount_point.is_dir() {
        return Err(Error::NotADirectory(
            config.mount_point.to_string_lossy().to_string(),
        ));
    }

    let view = ArchiveView::open(config.source_dir.clone())?;
    let fs = ArchiveFs::new(view, &config);

    info!(
        "Mounting {:?} at {:?} (read-only)",
        config.source_dir, config.mount_point
    );

    fuser::mount2(fs, &config.mount_point, &config.mount_options())?;

    info!("Unmounted {:?}", config.mount_point);
    Ok(())
}

/// Absolute, symlink-free form of the source directory, fixed at startup
fn canonical_source(path: &Path) -> Result<PathBuf> {
    let resolved = std::fs::canonicalize(path).map_err(|e| {
        Error::PathNotFound(format!("{}: {}", path.to_string_lossy(), e))
    })?;

    if !resolved.is_dir() {
        return Err(Error::NotADirectory(resolved.to_string_lossy().to_string()));
    }

    Ok(resolved)
}
