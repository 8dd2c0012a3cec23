//! Dashboard configuration.

use serde::{Deserialize, Serialize};

/// Dashboard server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Address to bind.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Production feed interval in milliseconds.
    #[serde(default = "default_production_interval_ms")]
    pub production_interval_ms: u64,
    /// Rates feed interval in milliseconds.
    #[serde(default = "default_rates_interval_ms")]
    pub rates_interval_ms: u64,
    /// Number of most recent events carried by each production update.
    #[serde(default = "default_recent_events_limit")]
    pub recent_events_limit: usize,
    /// Maximum concurrent WebSocket subscribers.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Per-subscriber queue depth. A subscriber whose queue is full when a
    /// broadcast arrives is dropped.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
    /// Origins allowed by CORS.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_production_interval_ms() -> u64 {
    2_000
}

fn default_rates_interval_ms() -> u64 {
    5_000
}

fn default_recent_events_limit() -> usize {
    50
}

fn default_max_connections() -> usize {
    64
}

fn default_subscriber_buffer() -> usize {
    32
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            production_interval_ms: default_production_interval_ms(),
            rates_interval_ms: default_rates_interval_ms(),
            recent_events_limit: default_recent_events_limit(),
            max_connections: default_max_connections(),
            subscriber_buffer: default_subscriber_buffer(),
            cors_origins: default_cors_origins(),
        }
    }
}
