//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] prodline_store::StoreError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] prodline_telemetry::TelemetryError),

    #[error("Dashboard error: {0}")]
    Dashboard(#[from] prodline_dashboard::DashboardError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
