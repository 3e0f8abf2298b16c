// src/logging.rs

use crate::config::Config;
use crate::constants::APP_NAME;
use crate::errors::{ChatlineError, ChatlineResult};
use flexi_logger::{detailed_format, Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming};
use std::path::PathBuf;

const MAX_LOG_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// Starts file logging. The terminal belongs to the UI, so nothing is
/// written to stdout or stderr. `RUST_LOG` takes precedence over the
/// configured level.
///
/// Keep the returned handle alive for the lifetime of the program.
pub fn init_logging(config: &Config) -> ChatlineResult<LoggerHandle> {
    let dir = log_directory(config)?;

    let handle = Logger::try_with_env_or_str(&config.log_level)?
        .log_to_file(FileSpec::default().directory(dir).basename(APP_NAME))
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(MAX_LOG_FILE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(3),
        )
        .append()
        .start()?;

    Ok(handle)
}

/// Where log files go: `log_dir` from the config, else the platform's local
/// data directory.
pub fn log_directory(config: &Config) -> ChatlineResult<PathBuf> {
    if let Some(dir) = &config.log_dir {
        return Ok(dir.clone());
    }
    dirs::data_local_dir()
        .map(|d| d.join(APP_NAME).join("logs"))
        .ok_or_else(|| ChatlineError::config_error("Could not determine a directory for log files"))
}
