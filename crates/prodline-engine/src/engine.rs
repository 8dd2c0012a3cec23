//! Store-bound facade over the estimators.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use prodline_core::{
    FlowDirection, MachineId, MachineSnapshot, NewProductionEvent, OverviewSnapshot,
    ProductionEvent,
};
use prodline_store::ProductionStore;
use prodline_telemetry::Metrics;
use tracing::info;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::history::{history, HistoryPoint};
use crate::overview::overview;
use crate::rate::RateEstimator;
use crate::status::StatusClassifier;

/// Result of a simulated production step.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub event: ProductionEvent,
    /// Recomputed rate for the event's `(machine, item_type)` pair.
    pub rate_per_minute: f64,
}

/// Shared handle bundling the store with the configured estimators.
#[derive(Clone)]
pub struct ProductionEngine {
    store: Arc<dyn ProductionStore>,
    rates: RateEstimator,
    status: StatusClassifier,
}

impl ProductionEngine {
    pub fn new(store: Arc<dyn ProductionStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            rates: RateEstimator::new(config.rate_window()),
            status: StatusClassifier::new(config.status_window()),
        }
    }

    pub fn store(&self) -> &Arc<dyn ProductionStore> {
        &self.store
    }

    /// Record `quantity` units of `item_type` for a machine at `now` and
    /// refresh the pair's rate estimate.
    ///
    /// Fails with `MachineNotFound` before anything is appended.
    pub fn simulate(
        &self,
        machine_id: MachineId,
        item_type: &str,
        quantity: i64,
        direction: Option<FlowDirection>,
        now: DateTime<Utc>,
    ) -> EngineResult<SimulationOutcome> {
        self.store.require_machine(machine_id)?;

        let mut new_event = NewProductionEvent::new(machine_id, item_type, quantity, now);
        new_event.direction = direction;
        let event = self.store.append_event(new_event)?;
        Metrics::event_appended();

        let rate_per_minute = self.rates.estimate(self.store.as_ref(), machine_id, item_type, now)?;

        info!(
            machine_id = %machine_id,
            item_type,
            quantity,
            rate_per_minute,
            "Production simulated"
        );
        Ok(SimulationOutcome {
            event,
            rate_per_minute,
        })
    }

    /// Recompute and persist one pair's rate.
    pub fn estimate(
        &self,
        machine_id: MachineId,
        item_type: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<f64> {
        self.rates
            .estimate(self.store.as_ref(), machine_id, item_type, now)
    }

    /// Status of every active machine.
    pub fn status(&self, now: DateTime<Utc>) -> EngineResult<Vec<MachineSnapshot>> {
        self.status.classify_active(self.store.as_ref(), now)
    }

    pub fn overview(&self) -> EngineResult<OverviewSnapshot> {
        overview(self.store.as_ref())
    }

    /// History of an existing machine; `MachineNotFound` otherwise.
    pub fn history(
        &self,
        machine_id: MachineId,
        item_type: Option<&str>,
        hours: i64,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<HistoryPoint>> {
        self.store.require_machine(machine_id)?;
        history(self.store.as_ref(), machine_id, item_type, hours, now)
    }
}

impl std::fmt::Debug for ProductionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductionEngine")
            .field("rate_window", &self.rates.window())
            .field("status_window_minutes", &self.status.window_minutes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use prodline_core::{MachineDraft, ProcessingStatus};
    use prodline_store::MemoryStore;

    fn engine() -> (ProductionEngine, MachineId) {
        let store = Arc::new(MemoryStore::new());
        let machine = store
            .create_machine(MachineDraft {
                name: "Lathe".to_string(),
                kind: "lathe".to_string(),
                x: 0.0,
                y: 0.0,
                input_capacity: 1,
                output_capacity: 1,
                processing_time: 2.0,
                input_items: vec!["rod".to_string()],
                output_items: vec!["shaft".to_string()],
            })
            .unwrap();
        (ProductionEngine::new(store, &EngineConfig::default()), machine.id)
    }

    #[test]
    fn test_simulate_appends_and_recomputes() {
        let (engine, machine_id) = engine();
        let now = Utc::now();

        engine.simulate(machine_id, "shaft", 40, None, now).unwrap();
        let outcome = engine
            .simulate(machine_id, "shaft", 20, None, now + Duration::seconds(1))
            .unwrap();

        assert_eq!(outcome.event.quantity, 20);
        assert_eq!(outcome.rate_per_minute, 6.0);

        let rates = engine.store().rate_estimates(Some(machine_id)).unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].rate_per_minute, 6.0);
    }

    #[test]
    fn test_simulate_unknown_machine_appends_nothing() {
        let (engine, _) = engine();
        let err = engine
            .simulate(MachineId(404), "shaft", 1, None, Utc::now())
            .unwrap_err();

        assert!(err.is_not_found());
        let events = engine
            .store()
            .query_events(&prodline_store::EventQuery::new())
            .unwrap();
        assert!(events.is_empty());
        assert!(engine.store().rate_estimates(None).unwrap().is_empty());
    }

    #[test]
    fn test_status_reflects_simulated_events() {
        let (engine, machine_id) = engine();
        let now = Utc::now();
        engine.simulate(machine_id, "shaft", 60, None, now).unwrap();
        engine
            .simulate(machine_id, "rod", -60, Some(FlowDirection::Input), now)
            .unwrap();

        let status = engine.status(now).unwrap();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].processing_status, ProcessingStatus::HighEfficiency);
        assert_eq!(status[0].current_input.get("rod"), Some(&60));

        let overview = engine.overview().unwrap();
        assert_eq!(overview.total_machines, 1);
        assert_eq!(overview.total_items_per_minute, 0.0);
    }

    #[test]
    fn test_history_requires_machine() {
        let (engine, _) = engine();
        let err = engine
            .history(MachineId(9), None, 1, Utc::now())
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
