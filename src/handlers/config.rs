//! Config loading and `init` handlers
//!
//! Resolves which config file a command uses, creates the default one on
//! first run, and applies the command-line sync directory override.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::config::ConfigManager;
use crate::model::Config;
use crate::tokens::TokenTable;

/// Load the config at `path`, or the default config file when `None`.
///
/// A missing default config is created from the built-in template first;
/// a missing explicit path is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let path = ConfigManager::config_file_path()?;
            if ConfigManager::write_default_config(&path, false)? {
                log::info!("Created default config at {}", path.display());
            }
            path
        }
    };

    log::debug!("loading config from {}", path.display());
    let tokens = TokenTable::from_env()?;
    Config::load(&path, &tokens)
        .with_context(|| format!("Failed to load config: {}", path.display()))
}

/// Apply a command-line sync directory, made absolute against the working
/// directory
pub fn apply_location(config: Config, location: Option<PathBuf>) -> Result<Config> {
    let Some(location) = location else {
        return Ok(config);
    };

    let location = if location.is_absolute() {
        location
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(location)
    };
    Ok(config.with_sync_dir(location))
}

/// Handle `init`: write the config template
pub fn handle_init(path: Option<&Path>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => ConfigManager::config_file_path()?,
    };

    if ConfigManager::write_default_config(&path, force)? {
        println!(
            "{} Wrote config template to {}",
            "✓".green(),
            path.display().to_string().cyan()
        );
        println!("  Set {} before running sync.", "settings.target.location".bold());
    } else {
        println!(
            "{} {} already exists. Use --force to overwrite.",
            "!".yellow(),
            path.display()
        );
    }

    Ok(())
}
