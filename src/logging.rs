//! Tracing setup. Output goes to a file because the terminal is owned by the
//! UI while the app runs.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use directories::BaseDirs;
use tracing_subscriber::EnvFilter;

const LOG_DIR: &str = ".copyright-desk";
const LOG_FILE: &str = "copyright-desk.log";

/// `~/.copyright-desk/copyright-desk.log`, or the working directory when no
/// home directory can be resolved.
pub fn default_log_path() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(LOG_DIR))
        .unwrap_or_else(|| PathBuf::from(LOG_DIR))
        .join(LOG_FILE)
}

/// Install the global subscriber. `filter` takes `EnvFilter` directives.
/// Returns the file the log is appended to.
pub fn init(filter: &str, path: Option<&Path>) -> Result<PathBuf> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_log_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_new(filter)
        .with_context(|| format!("invalid log filter '{filter}'"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install the tracing subscriber: {err}"))?;

    tracing::info!(path = %path.display(), "logging initialized");
    Ok(path)
}
