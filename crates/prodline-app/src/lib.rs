//! prodline - production line rate and status service.
//!
//! Wires the components together:
//! - Event log and layout store (optionally journaled to disk)
//! - Rate / status derivation engine
//! - HTTP API and live WebSocket feed

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
