//! prodline-dashboard - HTTP API and live push feed for prodline.
//!
//! This crate serves the production line over HTTP and WebSocket:
//!
//! - REST API for the line layout and the derived production views
//! - Live feed: recent events every 2s, rate estimates every 5s
//! - `/health` and Prometheus `/metrics`
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         prodline process                          │
//! │                                                                  │
//! │  ┌────────────────────────────────────────────────────────────┐  │
//! │  │   ProductionEngine (store + rate / status estimators)       │  │
//! │  └──────────────┬──────────────────────────────┬──────────────┘  │
//! │                 │                              │                 │
//! │  ┌──────────────▼─────────────┐  ┌─────────────▼──────────────┐  │
//! │  │ DashboardState (payloads)  │  │  REST handlers (/api/...)  │  │
//! │  └───────┬──────────┬─────────┘  └────────────────────────────┘  │
//! │          │          │                                            │
//! │  ┌───────▼───┐ ┌────▼──────┐     ┌────────────────────────────┐  │
//! │  │ production│ │   rates   │────▶│ SubscriberRegistry          │  │
//! │  │ feed (2s) │ │ feed (5s) │     │ (bounded queue/subscriber)  │  │
//! │  └───────────┘ └───────────┘     └─────────────┬──────────────┘  │
//! │                                                │                 │
//! │                      GET /ws, /ws/production, /ws/rates          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use prodline_dashboard::{AppState, DashboardConfig, DashboardState, SubscriberRegistry};
//!
//! let config = DashboardConfig::default();
//! let registry = Arc::new(SubscriberRegistry::new(
//!     config.max_connections,
//!     config.subscriber_buffer,
//! ));
//! let state = AppState::new(
//!     DashboardState::new(engine, config.recent_events_limit),
//!     registry,
//!     config,
//! );
//!
//! let shutdown = CancellationToken::new();
//! prodline_dashboard::run_server(state, shutdown).await?;
//! ```

mod api;
mod config;
mod error;
mod feed;
mod registry;
mod server;
mod state;
mod types;

pub use config::DashboardConfig;
pub use error::{ApiError, ApiResult, DashboardError, DashboardResult};
pub use feed::{publish, run_production_feed, run_rates_feed};
pub use registry::{SubscribeError, SubscriberId, SubscriberRegistry, Subscription, Topic, Topics};
pub use server::{bind, create_router, run_server, serve, AppState};
pub use state::DashboardState;
pub use types::{
    FeedMessage, HealthResponse, MachinePosition, MessageResponse, ProductionEntry, RateEntry,
    SimulateResponse,
};
