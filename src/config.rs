//! Course configuration loaded from TOML.
//!
//! The course layout (which upstream segments make up the main loop and the
//! climb/descent bonus groups) and the historical import start date are
//! supplied by the event organizers, never hard-coded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Upstream API base URL used when the config file does not override it.
const DEFAULT_BASE_URL: &str = "https://www.strava.com/api/v3";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Externally supplied course and import configuration.
///
/// Timestamps in the TOML file are quoted RFC 3339 strings, e.g.
/// `history_start = "2014-09-01T00:00:00Z"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseConfig {
    /// Upstream segment id of the main loop.
    pub main_segment_id: i64,
    /// Climb bonus group, exactly two segment ids.
    pub climb_segment_ids: Vec<i64>,
    /// Descent bonus group, exactly three segment ids.
    pub descent_segment_ids: Vec<i64>,
    /// Earliest activity date considered by the historical importer.
    pub history_start: DateTime<Utc>,
    /// Allow `resolve_forced` to bypass candidate enumeration.
    #[serde(default)]
    pub allow_forced_activity: bool,
    /// Upstream API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl CourseConfig {
    /// Check group sizes: two climb segments, three descent segments.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.climb_segment_ids.len() != 2 {
            return Err(ConfigError::InvalidGroup(format!(
                "climb group must have exactly 2 segments, got {}",
                self.climb_segment_ids.len()
            )));
        }
        if self.descent_segment_ids.len() != 3 {
            return Err(ConfigError::InvalidGroup(format!(
                "descent group must have exactly 3 segments, got {}",
                self.descent_segment_ids.len()
            )));
        }
        Ok(())
    }

    /// All bonus-group segment ids (climb then descent).
    pub fn bonus_segment_ids(&self) -> Vec<i64> {
        let mut ids = self.climb_segment_ids.clone();
        ids.extend_from_slice(&self.descent_segment_ids);
        ids
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "looptrial", "LoopTrial")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the default configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("course.toml")
}

/// Get the default database path.
pub fn get_database_path() -> PathBuf {
    get_data_dir().join("looptrial.db")
}

/// Load and validate course configuration from a file.
pub fn load_config(path: &PathBuf) -> Result<CourseConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Missing(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let config: CourseConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.validate()?;

    Ok(config)
}

/// Save course configuration to a file.
pub fn save_config(config: &CourseConfig, path: &PathBuf) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    Missing(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid segment group: {0}")]
    InvalidGroup(String),
}
