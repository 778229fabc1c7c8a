use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use crate::error::IngestError;

/// Environment variable naming an alternative config file
pub const CONFIG_ENV_VAR: &str = "PARTS_COUNTER_CONFIG";

/// Main configuration structure
///
/// Built once at startup and passed by reference into the pipeline; nothing
/// reads paths or the connection string from global state.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub connection_strings: ConnectionStrings,
    pub file_settings: FileSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Store connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionStrings {
    /// Path of the SQLite database file holding summary and breakdown logs
    pub default_connection: String,
}

/// Folder layout of the ingestion run
#[derive(Debug, Clone, Deserialize)]
pub struct FileSettings {
    /// Folder scanned for `*.xlsx` production logs
    pub logs_source_path: PathBuf,
    /// Root of the dated folders receiving files that failed
    pub error_logs_path: PathBuf,
    /// Root of the dated folders receiving files that were stored
    pub archive_logs_path: PathBuf,
    #[serde(default)]
    pub month_folder: MonthFolderStyle,
}

/// How the month level of `<root>/<year>/<month>` is named
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonthFolderStyle {
    /// English month name, e.g. `October`
    #[default]
    Name,
    /// Zero-padded month number, e.g. `10`
    Number,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. `explicit_path` (the `--config` flag)
    /// 2. Path specified in PARTS_COUNTER_CONFIG environment variable
    /// 3. ./config.toml in current directory
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = match explicit_path {
            Some(p) => p.to_path_buf(),
            None => std::env::var(CONFIG_ENV_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config.toml")),
        };

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid configuration in {}", config_path.display()))
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Failed to parse config.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> crate::Result<()> {
        if self.connection_strings.default_connection.trim().is_empty() {
            return Err(IngestError::Config(
                "connection_strings.default_connection must not be empty".to_string(),
            ));
        }
        self.check_folders()
    }

    /// Every configured folder must exist and be a directory; nothing is
    /// processed otherwise.
    pub fn check_folders(&self) -> crate::Result<()> {
        let folders = [
            ("Source", self.source_dir()),
            ("Error", self.error_root()),
            ("Archive", self.archive_root()),
        ];
        for (label, dir) in folders {
            if !dir.exists() {
                return Err(IngestError::Config(format!(
                    "{} Directory not found: {}",
                    label,
                    dir.display()
                )));
            }
            if !dir.is_dir() {
                return Err(IngestError::Config(format!(
                    "{} Directory must be a directory, not a file: {}",
                    label,
                    dir.display()
                )));
            }
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        Path::new(&self.connection_strings.default_connection)
    }

    pub fn source_dir(&self) -> &Path {
        &self.file_settings.logs_source_path
    }

    pub fn error_root(&self) -> &Path {
        &self.file_settings.error_logs_path
    }

    pub fn archive_root(&self) -> &Path {
        &self.file_settings.archive_logs_path
    }

    pub fn month_folder(&self) -> MonthFolderStyle {
        self.file_settings.month_folder
    }
}
