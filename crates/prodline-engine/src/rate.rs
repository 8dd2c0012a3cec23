//! Trailing-window rate estimation.
//!
//! `rate_per_minute = Σ quantity / window_minutes` over the events of one
//! `(machine, item_type)` pair inside `[now - window, now]`. The sum is
//! signed: consumption recorded as negative quantities lowers the rate.

use chrono::{DateTime, Duration, Utc};
use prodline_core::{MachineId, ProductionEvent, RateEstimate};
use prodline_store::{EventQuery, ProductionStore};
use prodline_telemetry::Metrics;
use tracing::debug;

use crate::error::EngineResult;

/// Computes and persists rate estimates.
#[derive(Debug, Clone)]
pub struct RateEstimator {
    window: Duration,
}

impl RateEstimator {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Window length in minutes, the divisor of the estimate.
    pub fn window_minutes(&self) -> f64 {
        self.window.num_seconds() as f64 / 60.0
    }

    /// Rate over `events`, assumed already restricted to the window.
    ///
    /// A zero-length window yields 0.0.
    pub fn rate_from_events(&self, events: &[ProductionEvent]) -> f64 {
        let minutes = self.window_minutes();
        if minutes <= 0.0 {
            return 0.0;
        }
        // Widened: an i128 sum of fewer than 2^64 i64 values cannot overflow
        let total: i128 = events.iter().map(|e| i128::from(e.quantity)).sum();
        total as f64 / minutes
    }

    /// Recompute the estimate for `(machine_id, item_type)` at `now` and
    /// upsert it, even when the window holds no events.
    ///
    /// Machine existence is not checked here.
    pub fn estimate(
        &self,
        store: &dyn ProductionStore,
        machine_id: MachineId,
        item_type: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<f64> {
        let query = EventQuery::new()
            .machine(machine_id)
            .item_type(item_type)
            .window(now - self.window, now);
        let events = store.query_events(&query)?;
        let rate_per_minute = self.rate_from_events(&events);

        store.upsert_rate_estimate(RateEstimate {
            machine_id,
            item_type: item_type.to_string(),
            rate_per_minute,
            calculated_at: now,
        })?;
        Metrics::rate_recomputed();

        debug!(
            machine_id = %machine_id,
            item_type,
            events = events.len(),
            rate_per_minute,
            "Rate estimate updated"
        );
        Ok(rate_per_minute)
    }
}

impl Default for RateEstimator {
    fn default() -> Self {
        Self::new(Duration::minutes(10))
    }
}
