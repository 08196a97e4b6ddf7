use anyhow::{Context, Result};
use chrono::Local;
use std::path::PathBuf;

use crate::config::LoggingConfig;
use crate::constants::{APP_NAME, LOG_FILE_NAME};

/// Path of the log file: `$XDG_DATA_HOME/daily-organizer/daily-organizer.log`
pub fn get_log_file_path() -> Result<PathBuf> {
    dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
        .map(|dir| dir.join(APP_NAME).join(LOG_FILE_NAME))
}

/// Build the log dispatch for `config` without installing it.
///
/// Returns `None` when logging is disabled.
pub fn build_dispatch(config: &LoggingConfig) -> Result<Option<(fern::Dispatch, PathBuf)>> {
    if !config.enabled {
        return Ok(None);
    }

    let level = config.level_filter()?;
    let path = get_log_file_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    let file = fern::log_file(&path).with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(file);

    Ok(Some((dispatch, path)))
}

/// Install the global logger described by `config`.
///
/// Returns the log file path when logging is enabled. Can only succeed once
/// per process.
pub fn setup_logger(config: &LoggingConfig) -> Result<Option<PathBuf>> {
    match build_dispatch(config)? {
        Some((dispatch, path)) => {
            dispatch.apply().context("A global logger is already installed")?;
            log::info!("Logging to {}", path.display());
            Ok(Some(path))
        }
        None => Ok(None),
    }
}
