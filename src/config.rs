//! Configuration for the Vigil monitoring agent.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the agent.
///
/// All hysteresis thresholds and alert cooldowns live here so a deployment
/// can tune them without rebuilding; the defaults are the tuned values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Consecutive stranger frames required before a security alert
    pub unknown_threshold: u32,

    /// Consecutive no-face frames after which stranger detection re-arms
    pub no_face_reset_threshold: u32,

    /// How long a known identity persists through detection dropouts (seconds)
    pub ghost_grace_secs: u64,

    /// Re-check interval for the expensive identity classification (seconds)
    pub face_recheck_secs: u64,

    /// Stillness duration after a fall before a no-movement warning (seconds)
    pub stillness_timeout_secs: u64,

    /// Maximum number of alerts retained in history
    pub history_limit: usize,

    /// Window within which an identical alert message is suppressed (seconds)
    pub duplicate_suppress_secs: u64,

    /// Minimum re-fire interval per alert category
    pub cooldowns: CooldownConfig,

    /// Base sampling interval for the sensing loop (milliseconds)
    pub poll_interval_ms: u64,

    /// Port for the dashboard API
    pub api_port: u16,

    /// Origin allowed to call the dashboard API
    pub dashboard_origin: String,

    /// Path to the user/reminder directory file
    pub users_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vigil-agent");

        Self {
            unknown_threshold: 15,
            no_face_reset_threshold: 60,
            ghost_grace_secs: 12,
            face_recheck_secs: 5,
            stillness_timeout_secs: 10,
            history_limit: 50,
            duplicate_suppress_secs: 60,
            cooldowns: CooldownConfig::default(),
            poll_interval_ms: 500,
            api_port: 7878,
            dashboard_origin: "http://localhost:8080".to_string(),
            users_path: data_dir.join("users.json"),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vigil-agent")
            .join("config.json")
    }
}

/// Minimum re-fire interval per alert category, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownConfig {
    pub motion_secs: u64,
    pub reminder_secs: u64,
    pub emergency_secs: u64,
    pub warning_secs: u64,
    pub security_secs: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            motion_secs: 5,
            reminder_secs: 30,
            emergency_secs: 10,
            warning_secs: 15,
            security_secs: 10,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
