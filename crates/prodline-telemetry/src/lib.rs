//! Prometheus metrics and structured logging for prodline.
//!
//! - Structured logging with tracing (pretty in development, JSON in production)
//! - Prometheus counters for the event log, rate recomputation and the live feed

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
