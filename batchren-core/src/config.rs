use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::rule::{DEFAULT_DATE_FORMAT, DEFAULT_SEQUENCE_FORMAT};

/// Directory holding the config file and the operation log
pub const CONFIG_DIR: &str = ".batchren";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default preview format: "table", "summary", "json", or "none"
    #[serde(default = "default_preview")]
    pub preview_format: String,

    /// Directory in which `rename_backup_*` directories are created
    #[serde(default = "default_backup_root")]
    pub backup_root: PathBuf,

    /// Whether to use color output by default (None = auto-detect)
    #[serde(default)]
    pub use_color: Option<bool>,

    /// Template used by the sequence rule when none is given
    #[serde(default = "default_sequence_format")]
    pub sequence_format: String,

    /// First number of the sequence rule
    #[serde(default = "default_sequence_start")]
    pub sequence_start: i64,

    /// strftime format used by the date-prefix rule when none is given
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Operation log location; an empty path disables logging
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            preview_format: default_preview(),
            backup_root: default_backup_root(),
            use_color: None,
            sequence_format: default_sequence_format(),
            sequence_start: default_sequence_start(),
            date_format: default_date_format(),
            log_file: default_log_file(),
        }
    }
}

fn default_preview() -> String {
    "table".to_string()
}

fn default_backup_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_sequence_format() -> String {
    DEFAULT_SEQUENCE_FORMAT.to_string()
}

fn default_sequence_start() -> i64 {
    1
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_log_file() -> PathBuf {
    Path::new(CONFIG_DIR).join("batchren.log")
}

impl Config {
    /// Load config from .batchren/config.toml if it exists
    pub fn load() -> Result<Self> {
        if let Ok(cwd) = std::env::current_dir() {
            let config_path = cwd.join(CONFIG_DIR).join("config.toml");
            if config_path.exists() {
                return Self::load_from_path(&config_path);
            }
        }

        // Return default config if no config file exists
        Ok(Self::default())
    }

    /// Load config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save config to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Log file to use, or `None` when logging is disabled
    pub fn log_path(&self) -> Option<&Path> {
        let path = self.defaults.log_file.as_path();
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    }
}
