//! Production rate and status derivation.
//!
//! Turns the append-only production event log into:
//! - smoothed per-machine, per-item rates ([`RateEstimator`])
//! - live machine status and efficiency ([`StatusClassifier`])
//! - fleet-level totals ([`overview`])
//!
//! Every computation takes `now` from the caller; nothing here samples the
//! wall clock, so windows are reproducible in tests.

pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod overview;
pub mod rate;
pub mod status;

pub use config::EngineConfig;
pub use engine::{ProductionEngine, SimulationOutcome};
pub use error::{EngineError, EngineResult};
pub use history::{history, HistoryPoint};
pub use overview::overview;
pub use rate::RateEstimator;
pub use status::{efficiency, status_for, StatusClassifier};
