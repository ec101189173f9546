use anyhow::{Context, Result};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::config::ConfigManager;

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10MB

/// Initialize the logging system
///
/// Console output goes to stdout at `Info`, or `Debug` with `verbose`.
/// The `RUST_LOG` environment variable overrides both:
/// - `RUST_LOG=error` - Only errors
/// - `RUST_LOG=warn` - Warnings and errors
/// - `RUST_LOG=debug` - Debug and above
///
/// The level is fixed here for the whole process. Run summaries are also
/// appended to `konsync.log` in the config directory through [`log_to_file`].
///
/// ## Examples
///
/// ```bash
/// # Show every filesystem operation
/// konsync -v sync
///
/// # Only show errors on console
/// RUST_LOG=error konsync sync
/// ```
pub fn init_logger(verbose: bool) -> Result<()> {
    ConfigManager::ensure_config_dir()?;

    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(default_level);

    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{:5}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(level)
        .target(env_logger::Target::Stdout)
        .try_init()
        .ok(); // Ignore error if logger is already initialized

    rotate_log_if_needed()?;
    log_to_file(&format!("Logger initialized with level: {level:?}"))?;

    Ok(())
}

/// Append a timestamped line to the log file
pub fn log_to_file(message: &str) -> Result<()> {
    append_line(&ConfigManager::log_file_path()?, message)
}

fn append_line(log_path: &Path, message: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        message
    )?;

    Ok(())
}

/// Rotate the log file to `konsync.log.old` once it exceeds 10MB
pub fn rotate_log_if_needed() -> Result<()> {
    rotate(&ConfigManager::log_file_path()?, MAX_LOG_SIZE)
}

fn rotate(log_path: &Path, max_size: u64) -> Result<()> {
    if !log_path.exists() {
        return Ok(());
    }

    let metadata = std::fs::metadata(log_path)?;
    if metadata.len() > max_size {
        let old_log_path = log_path.with_extension("log.old");

        if old_log_path.exists() {
            std::fs::remove_file(&old_log_path)?;
        }
        std::fs::rename(log_path, &old_log_path)?;

        log::info!("Log file rotated to {}", old_log_path.display());
    }

    Ok(())
}
