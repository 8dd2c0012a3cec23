//! Derivation window configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Trailing window lengths used by the estimators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rate estimation window (seconds). Default: 600 (10 minutes).
    #[serde(default = "default_rate_window_secs")]
    pub rate_window_secs: u64,
    /// Status classification window (seconds). Default: 300 (5 minutes).
    #[serde(default = "default_status_window_secs")]
    pub status_window_secs: u64,
}

fn default_rate_window_secs() -> u64 {
    600
}

fn default_status_window_secs() -> u64 {
    300
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rate_window_secs: default_rate_window_secs(),
            status_window_secs: default_status_window_secs(),
        }
    }
}

impl EngineConfig {
    pub fn rate_window(&self) -> Duration {
        Duration::seconds(self.rate_window_secs as i64)
    }

    pub fn status_window(&self) -> Duration {
        Duration::seconds(self.status_window_secs as i64)
    }
}
