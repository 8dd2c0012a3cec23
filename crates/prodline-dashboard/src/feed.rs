//! Live feed timers.
//!
//! Two independent tasks build a snapshot at a fixed interval and broadcast
//! it to the subscribers of their topic. A failed snapshot is logged and the
//! timer keeps running; cancellation stops it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use prodline_telemetry::Metrics;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::registry::{SubscriberRegistry, Topic};
use crate::state::DashboardState;

/// Production feed: recent events and active machine positions.
pub async fn run_production_feed(
    state: DashboardState,
    registry: Arc<SubscriberRegistry>,
    period: Duration,
    shutdown: CancellationToken,
) {
    run_feed(Topic::Production, state, registry, period, shutdown).await;
}

/// Rates feed: current rate estimates.
pub async fn run_rates_feed(
    state: DashboardState,
    registry: Arc<SubscriberRegistry>,
    period: Duration,
    shutdown: CancellationToken,
) {
    run_feed(Topic::Rates, state, registry, period, shutdown).await;
}

async fn run_feed(
    topic: Topic,
    state: DashboardState,
    registry: Arc<SubscriberRegistry>,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(feed = topic.as_str(), period_ms = period.as_millis() as u64, "Feed started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!(feed = topic.as_str(), "Feed stopped");
                break;
            }
            _ = interval.tick() => {
                publish(topic, &state, &registry);
            }
        }
    }
}

/// Build and broadcast one snapshot. Returns the number of deliveries.
pub fn publish(topic: Topic, state: &DashboardState, registry: &SubscriberRegistry) -> usize {
    if registry.is_empty() {
        trace!(feed = topic.as_str(), "No subscribers connected");
        return 0;
    }

    let message = match state.update_for(topic, Utc::now()) {
        Ok(message) => message,
        Err(e) => {
            warn!(feed = topic.as_str(), error = %e, "Failed to build feed snapshot");
            return 0;
        }
    };

    match serde_json::to_string(&message) {
        Ok(json) => {
            let delivered = registry.broadcast(topic, &json);
            Metrics::broadcast(topic.as_str());
            trace!(feed = topic.as_str(), delivered, "Broadcast update sent");
            delivered
        }
        Err(e) => {
            debug!(feed = topic.as_str(), error = %e, "Failed to serialize feed update");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use prodline_core::MachineDraft;
    use prodline_engine::{EngineConfig, ProductionEngine};
    use prodline_store::{MemoryStore, ProductionStore};

    use crate::registry::Topics;

    fn state() -> (DashboardState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let engine = ProductionEngine::new(store.clone(), &EngineConfig::default());
        (DashboardState::new(engine, 50), store)
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let (state, _) = state();
        let registry = SubscriberRegistry::new(4, 4);
        assert_eq!(publish(Topic::Production, &state, &registry), 0);
    }

    #[tokio::test]
    async fn test_feeds_deliver_tagged_messages() {
        let (state, store) = state();
        store
            .create_machine(MachineDraft {
                name: "Press".to_string(),
                kind: "press".to_string(),
                x: 0.0,
                y: 0.0,
                input_capacity: 1,
                output_capacity: 1,
                processing_time: 2.0,
                input_items: vec![],
                output_items: vec!["gear".to_string()],
            })
            .unwrap();
        let registry = Arc::new(SubscriberRegistry::new(4, 16));
        let mut production = registry.subscribe(Topics::only(Topic::Production)).unwrap();
        let mut rates = registry.subscribe(Topics::only(Topic::Rates)).unwrap();
        let shutdown = CancellationToken::new();

        let production_task = tokio::spawn(run_production_feed(
            state.clone(),
            registry.clone(),
            Duration::from_millis(10),
            shutdown.clone(),
        ));
        let rates_task = tokio::spawn(run_rates_feed(
            state,
            registry.clone(),
            Duration::from_millis(10),
            shutdown.clone(),
        ));

        let msg = tokio::time::timeout(Duration::from_secs(2), production.recv())
            .await
            .unwrap()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(json["type"], "production_update");
        assert_eq!(json["machine_status"][0]["name"], "Press");

        let msg = tokio::time::timeout(Duration::from_secs(2), rates.recv())
            .await
            .unwrap()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(json["type"], "rates_update");

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), production_task)
            .await
            .unwrap()
            .unwrap();
        tokio::time::timeout(Duration::from_secs(2), rates_task)
            .await
            .unwrap()
            .unwrap();
    }
}
