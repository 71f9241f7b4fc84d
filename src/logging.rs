//! Diagnostic logging to a file.
//!
//! The terminal belongs to the UI, so events go to an append-only log file.
//! Entry text and passwords are never logged; ids, counts and error messages
//! are.

use crate::errors::{AppError, AppResult};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `filter` is an `EnvFilter` directive
/// such as `info` or `mood_journal=debug`.
pub fn init_logging(log_file: &Path, filter: &str) -> AppResult<()> {
    let filter = EnvFilter::try_new(filter)
        .map_err(|e| AppError::Logging(format!("invalid log filter '{filter}': {e}")))?;

    if let Some(dir) = log_file.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))
}
