//! Application configuration.
//!
//! Configuration is stored in TOML and describes which folder to watch, how
//! long a file must stay quiet before it is considered finished, and which
//! extensions map to which category subfolder:
//!
//! ```toml
//! watch_folder = "~/Downloads"
//! debounce_seconds = 2.0
//!
//! [[categories]]
//! name = "Images"
//! extensions = [".jpg", ".png", ".gif"]
//!
//! [[categories]]
//! name = "Documents"
//! extensions = [".pdf", ".txt"]
//! ```
//!
//! Categories are an array of tables so their order is preserved; when two
//! categories claim the same extension, the one listed last wins.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::category::CategoryRule;

/// Errors that can occur during configuration loading.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    ConfigInvalid(String),
    /// IO error while reading configuration.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::IoError(msg) => write!(f, "IO error reading configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Top-level configuration value consumed by the sorter and the shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Folder to monitor. A leading `~` is expanded against `$HOME`.
    pub watch_folder: String,

    /// Quiet time in seconds a file must accumulate before it is moved.
    #[serde(default = "default_debounce_seconds")]
    pub debounce_seconds: f64,

    /// Ordered category rules; later rules win extension conflicts.
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryRule>,
}

fn default_debounce_seconds() -> f64 {
    2.0
}

/// Built-in category table used when the config file does not provide one.
fn default_categories() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new(
            "Images",
            &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".heic"],
        ),
        CategoryRule::new(
            "Documents",
            &[".pdf", ".doc", ".docx", ".txt", ".md", ".rtf", ".odt"],
        ),
        CategoryRule::new("Videos", &[".mp4", ".mkv", ".mov", ".avi", ".webm"]),
        CategoryRule::new("Music", &[".mp3", ".wav", ".flac", ".m4a", ".ogg"]),
        CategoryRule::new("Archives", &[".zip", ".tar", ".gz", ".rar", ".7z"]),
        CategoryRule::new(
            "Installers",
            &[".dmg", ".pkg", ".exe", ".msi", ".deb", ".rpm", ".appimage"],
        ),
    ]
}

impl Config {
    /// Load configuration with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `droptidy.toml` in the current directory
    /// 3. Look for `~/.config/droptidy/config.toml`
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file exists but cannot be read or
    /// parsed. A missing explicitly-given file is an error; a missing
    /// fallback file is not.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from("droptidy.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("droptidy")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// The watch folder with `~` expanded.
    pub fn watch_folder(&self) -> PathBuf {
        expand_home(&self.watch_folder)
    }

    /// The debounce window as a `Duration`.
    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.debounce_seconds.max(0.0))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_folder: "~/Downloads".to_string(),
            debounce_seconds: default_debounce_seconds(),
            categories: default_categories(),
        }
    }
}

/// Expands a leading `~` or `~/` against `$HOME`. Paths without a tilde are
/// returned unchanged.
fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home);
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(path)
}
