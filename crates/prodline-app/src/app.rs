//! Application wiring.
//!
//! Builds the store, engine, subscriber registry and HTTP server from an
//! [`AppConfig`] and runs them until Ctrl-C or an external cancellation.

use std::sync::Arc;

use prodline_dashboard::{AppState, DashboardState, SubscriberRegistry};
use prodline_engine::ProductionEngine;
use prodline_store::{MemoryStore, ProductionStore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::AppResult;

/// Main application.
pub struct Application {
    config: AppConfig,
    store: Arc<MemoryStore>,
    registry: Arc<SubscriberRegistry>,
    shutdown: CancellationToken,
}

impl Application {
    /// Create the application, replaying the event journal when configured.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let store = match &config.store.journal_path {
            Some(path) => {
                let store = MemoryStore::with_journal(path)?;
                info!(
                    path = %path.display(),
                    events = store.event_count(),
                    "Event journal replayed"
                );
                store
            }
            None => {
                info!("Running with in-memory event log only");
                MemoryStore::new()
            }
        };

        let registry = Arc::new(SubscriberRegistry::new(
            config.dashboard.max_connections,
            config.dashboard.subscriber_buffer,
        ));

        Ok(Self {
            config,
            store: Arc::new(store),
            registry,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn ProductionStore> {
        self.store.clone()
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Token that stops the application when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Shared HTTP state for the configured engine and registry.
    pub fn app_state(&self) -> AppState {
        let engine = ProductionEngine::new(self.store(), &self.config.engine);
        AppState::new(
            DashboardState::new(engine, self.config.dashboard.recent_events_limit),
            self.registry.clone(),
            self.config.dashboard.clone(),
        )
    }

    /// Run until Ctrl-C or the shutdown token is cancelled.
    pub async fn run(self) -> AppResult<()> {
        let state = self.app_state();
        let shutdown = self.shutdown.clone();

        let signal = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    match result {
                        Ok(()) => info!("Shutdown signal received"),
                        Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
                    }
                    signal.cancel();
                }
                _ = signal.cancelled() => {}
            }
        });

        info!(
            bind_address = %self.config.dashboard.bind_address,
            port = self.config.dashboard.port,
            "Starting application"
        );
        prodline_dashboard::run_server(state, shutdown).await?;

        info!(
            events = self.store.event_count(),
            "Shutdown complete"
        );
        Ok(())
    }
}
