//! Logging init: file under the XDG state dir, or stderr (verbose mode / fallback).

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const FILE_FILTER: &str = "info,fanfetch_core=debug,fanfetch=debug";

/// `RUST_LOG` wins over the built-in default.
fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Log to `~/.local/state/fanfetch/fanfetch.log` (appending).
/// Returns Err when the file cannot be opened so the caller can fall back to stderr.
pub fn init_logging() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("fanfetch")?;
    let path = xdg_dirs.place_state_file("fanfetch.log")?;
    let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(FILE_FILTER))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install subscriber: {}", e))?;

    tracing::info!("fanfetch logging initialized at {}", path.display());
    Ok(path)
}

/// Log to stderr only: everything at debug when `verbose`, otherwise warnings.
pub fn init_logging_stderr(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(if verbose { "debug" } else { "warn" }))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
