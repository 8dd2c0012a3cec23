//! Application configuration.

use std::path::{Path, PathBuf};

use prodline_dashboard::DashboardConfig;
use prodline_engine::EngineConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "PRODLINE_CONFIG";

/// Event log persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON Lines journal replayed at startup and appended to on every
    /// event. In-memory only when unset.
    #[serde(default)]
    pub journal_path: Option<PathBuf>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl AppConfig {
    /// Load `path` if given, otherwise `PRODLINE_CONFIG`, otherwise the
    /// default file. A missing default file yields the defaults; an
    /// explicitly named file must exist.
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        let explicit = path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok());

        let config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(DEFAULT_CONFIG_PATH)?
            }
            None => {
                tracing::warn!(path = DEFAULT_CONFIG_PATH, "Config file not found, using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Reject values that would stall a timer or divide by an empty window.
    pub fn validate(&self) -> AppResult<()> {
        let checks = [
            (self.dashboard.production_interval_ms == 0, "dashboard.production_interval_ms"),
            (self.dashboard.rates_interval_ms == 0, "dashboard.rates_interval_ms"),
            (self.dashboard.max_connections == 0, "dashboard.max_connections"),
            (self.dashboard.subscriber_buffer == 0, "dashboard.subscriber_buffer"),
            (self.engine.rate_window_secs == 0, "engine.rate_window_secs"),
            (self.engine.status_window_secs == 0, "engine.status_window_secs"),
        ];
        match checks.iter().find(|(invalid, _)| *invalid) {
            Some((_, field)) => Err(AppError::Config(format!("{field} must be greater than 0"))),
            None => Ok(()),
        }
    }
}
