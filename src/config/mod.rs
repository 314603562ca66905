use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

pub mod defaults;

use defaults::*;

/// Top-level daemon configuration, loaded from a TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Directory layout for all durable state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// One JSON file per schedule lives here
    #[serde(default = "default_schedules_path")]
    pub schedules_path: PathBuf,
    /// The history catalog document lives here
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
    /// Generated report artifacts live here
    #[serde(default = "default_reports_path")]
    pub reports_path: PathBuf,
    /// Data source files (`<name>.json` / `<name>.csv`) live here
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
}

/// Age-based history retention
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Reports older than this many days are removed by the retention loop;
    /// zero or negative disables cleanup entirely
    #[serde(default = "default_max_report_age_days")]
    pub max_report_age_days: i64,
    /// How often the retention loop runs, humantime syntax
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: String,
}

/// Email notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// When false, `send` is a no-op and no transport is installed
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

fn default_schedules_path() -> PathBuf {
    PathBuf::from(DEFAULT_SCHEDULES_PATH)
}

fn default_history_path() -> PathBuf {
    PathBuf::from(DEFAULT_HISTORY_PATH)
}

fn default_reports_path() -> PathBuf {
    PathBuf::from(DEFAULT_REPORTS_PATH)
}

fn default_data_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_PATH)
}

fn default_max_report_age_days() -> i64 {
    DEFAULT_MAX_REPORT_AGE_DAYS
}

fn default_cleanup_interval() -> String {
    DEFAULT_CLEANUP_INTERVAL.to_string()
}

fn default_from_address() -> String {
    DEFAULT_FROM_ADDRESS.to_string()
}

fn default_subject_prefix() -> String {
    DEFAULT_SUBJECT_PREFIX.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            schedules_path: default_schedules_path(),
            history_path: default_history_path(),
            reports_path: default_reports_path(),
            data_path: default_data_path(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_report_age_days: default_max_report_age_days(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            from_address: default_from_address(),
            subject_prefix: default_subject_prefix(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            retention: RetentionConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    /// Load configuration, writing a default config file when none exists
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            Ok(default_config)
        }
    }
}
