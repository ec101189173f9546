use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Cross-platform configuration directory manager
pub struct ConfigManager;

impl ConfigManager {
    /// Get the main configuration directory path following platform conventions:
    /// - Linux: $XDG_CONFIG_HOME/konsync or ~/.config/konsync
    /// - macOS: ~/Library/Application Support/konsync
    /// - Windows: %APPDATA%\konsync
    pub fn config_dir() -> Result<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            // Follow XDG Base Directory Specification
            if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
                Ok(PathBuf::from(xdg_config).join("konsync"))
            } else {
                let home = dirs::home_dir().context("Failed to get home directory")?;
                Ok(home.join(".config").join("konsync"))
            }
        }

        #[cfg(target_os = "macos")]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home.join("Library").join("Application Support").join("konsync"))
        }

        #[cfg(target_os = "windows")]
        {
            Ok(dirs::config_dir()
                .context("Failed to get Windows config directory")?
                .join("konsync"))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home.join(".konsync"))
        }
    }

    /// Get the default config file path (conf.yaml)
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("conf.yaml"))
    }

    /// Get the log file path
    pub fn log_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("konsync.log"))
    }

    /// Ensure the configuration directory exists
    pub fn ensure_config_dir() -> Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
        Ok(config_dir)
    }

    /// Write the built-in config template to `path`.
    ///
    /// Returns `false` without touching anything when the file already exists
    /// and `overwrite` is not set.
    pub fn write_default_config(path: &Path, overwrite: bool) -> Result<bool> {
        if path.exists() && !overwrite {
            return Ok(false);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        fs::write(path, default_template())
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(true)
    }
}

fn default_template() -> &'static str {
    let desktop = std::env::var("XDG_CURRENT_DESKTOP").unwrap_or_default();
    if desktop.split(':').any(|d| d == "KDE") {
        KDE_TEMPLATE
    } else {
        GENERIC_TEMPLATE
    }
}

const GENERIC_TEMPLATE: &str = r#"# konsync configuration
#
# Tokens usable in any location:
#   $HOME $CONFIG_DIR $SHARE_DIR $BIN_DIR
#   ${ENDS_WITH='text'}   first directory whose name ends with text
#   ${BEGINS_WITH='text'} first directory whose name begins with text

settings:
  target:
    location:
    export_name: konsync.zpaq
  compression:
    algorithm: fpaq
    level: 3
    args:

sync:
  configs:
    location: $CONFIG_DIR
    entries:
      - git
  home:
    location: $HOME
    entries:
      - .bashrc
      - .profile

export:
  share:
    location: $SHARE_DIR
    entries:
"#;

const KDE_TEMPLATE: &str = r#"# konsync configuration (KDE Plasma)
#
# Tokens usable in any location:
#   $HOME $CONFIG_DIR $SHARE_DIR $BIN_DIR
#   ${ENDS_WITH='text'}   first directory whose name ends with text
#   ${BEGINS_WITH='text'} first directory whose name begins with text

settings:
  target:
    location:
    export_name: konsync.zpaq
  compression:
    algorithm: fpaq
    level: 3
    args:

sync:
  configs:
    location: $CONFIG_DIR
    entries:
      - kdeglobals
      - kwinrc
      - kwinrulesrc
      - plasmarc
      - plasmashellrc
      - plasma-org.kde.plasma.desktop-appletsrc
      - kglobalshortcutsrc
      - khotkeysrc
      - kscreenlockerrc
      - ksmserverrc
      - dolphinrc
      - konsolerc
      - gtk-3.0
      - gtk-4.0
  firefox:
    location: $HOME/.mozilla/firefox/${ENDS_WITH='default-release'}
    entries:
      - chrome

export:
  share:
    location: $SHARE_DIR
    entries:
      - plasma
      - kwin
      - color-schemes
      - aurorae
      - icons
      - konsole
      - fonts
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_config_paths() {
        let config_dir = ConfigManager::config_dir().unwrap();
        assert!(config_dir.to_string_lossy().contains("konsync"));

        let config_file = ConfigManager::config_file_path().unwrap();
        assert!(config_file.to_string_lossy().ends_with("conf.yaml"));

        let log = ConfigManager::log_file_path().unwrap();
        assert!(log.to_string_lossy().contains("konsync.log"));
    }

    #[test]
    #[serial]
    #[cfg(target_os = "linux")]
    fn test_xdg_config_home_respected() {
        std::env::set_var("XDG_CONFIG_HOME", "/tmp/test-xdg-config");
        let config_dir = ConfigManager::config_dir().unwrap();
        assert!(config_dir.to_string_lossy().contains("/tmp/test-xdg-config/konsync"));
        std::env::remove_var("XDG_CONFIG_HOME");
    }

    #[test]
    #[serial]
    fn test_write_default_config_respects_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("conf.yaml");

        assert!(ConfigManager::write_default_config(&path, false).unwrap());
        assert!(fs::read_to_string(&path).unwrap().contains("settings:"));

        fs::write(&path, "custom").unwrap();
        assert!(!ConfigManager::write_default_config(&path, false).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "custom");

        assert!(ConfigManager::write_default_config(&path, true).unwrap());
        assert_ne!(fs::read_to_string(&path).unwrap(), "custom");
    }

    #[test]
    #[serial]
    fn test_kde_template_selected_from_desktop() {
        std::env::set_var("XDG_CURRENT_DESKTOP", "KDE");
        assert!(default_template().contains("kdeglobals"));
        std::env::set_var("XDG_CURRENT_DESKTOP", "GNOME");
        assert!(!default_template().contains("kdeglobals"));
        std::env::remove_var("XDG_CURRENT_DESKTOP");
    }

    #[test]
    fn test_templates_parse() {
        for template in [GENERIC_TEMPLATE, KDE_TEMPLATE] {
            let value: serde_yaml::Value = serde_yaml::from_str(template).unwrap();
            assert!(value.get("sync").is_some());
            assert!(value.get("settings").is_some());
        }
    }
}
