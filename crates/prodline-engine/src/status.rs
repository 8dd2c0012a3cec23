//! Machine status classification.
//!
//! Over the trailing status window:
//! - `total_processed = Σ |quantity|`, widened so no quantity overflows it
//! - `actual_rate = total_processed / window_minutes`
//! - `expected_rate = 60 / processing_time` (0 when `processing_time <= 0`)
//! - `efficiency = min(actual / expected * 100, 100)`, or 0 without capacity
//!
//! Thresholds, first match wins: nothing processed is idle, then
//! `>= 80` high efficiency, `>= 50` normal, otherwise low efficiency.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use prodline_core::{FlowDirection, Machine, MachineSnapshot, ProcessingStatus, ProductionEvent};
use prodline_store::{EventQuery, ProductionStore};

use crate::error::EngineResult;

const HIGH_EFFICIENCY_PCT: f64 = 80.0;
const NORMAL_EFFICIENCY_PCT: f64 = 50.0;

/// Classify from the processed total and efficiency.
pub fn status_for(total_processed: u128, efficiency: f64) -> ProcessingStatus {
    if total_processed == 0 {
        ProcessingStatus::Idle
    } else if efficiency >= HIGH_EFFICIENCY_PCT {
        ProcessingStatus::HighEfficiency
    } else if efficiency >= NORMAL_EFFICIENCY_PCT {
        ProcessingStatus::Normal
    } else {
        ProcessingStatus::LowEfficiency
    }
}

/// Efficiency percentage, capped at 100.
///
/// Degenerate windows or capacities yield 0 rather than dividing by zero.
pub fn efficiency(total_processed: u128, window_minutes: f64, processing_time: f64) -> f64 {
    if window_minutes <= 0.0 || processing_time <= 0.0 || !processing_time.is_finite() {
        return 0.0;
    }
    let expected_rate = 60.0 / processing_time;
    let actual_rate = total_processed as f64 / window_minutes;
    (actual_rate / expected_rate * 100.0).min(100.0)
}

/// Computes live status snapshots.
#[derive(Debug, Clone)]
pub struct StatusClassifier {
    window: Duration,
}

impl StatusClassifier {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window_minutes(&self) -> f64 {
        self.window.num_seconds() as f64 / 60.0
    }

    /// Classify `machine` from `events` at `now`.
    ///
    /// Events belonging to other machines or outside `[now - window, now]`
    /// are ignored, so callers may pass a superset.
    pub fn classify(
        &self,
        machine: &Machine,
        events: &[ProductionEvent],
        now: DateTime<Utc>,
    ) -> MachineSnapshot {
        let since = now - self.window;
        let mut current_input: BTreeMap<String, i64> = BTreeMap::new();
        let mut current_output: BTreeMap<String, i64> = BTreeMap::new();
        let mut total_processed: u128 = 0;

        for event in events.iter().filter(|e| {
            e.machine_id == machine.id && e.timestamp >= since && e.timestamp <= now
        }) {
            match event.direction_for(machine) {
                FlowDirection::Output => {
                    let bucket = current_output.entry(event.item_type.clone()).or_insert(0);
                    *bucket = bucket.saturating_add(event.quantity);
                }
                FlowDirection::Input => {
                    let bucket = current_input.entry(event.item_type.clone()).or_insert(0);
                    *bucket = bucket.saturating_add(event.quantity.saturating_abs());
                }
            }
            total_processed += u128::from(event.quantity.unsigned_abs());
        }

        let efficiency = efficiency(total_processed, self.window_minutes(), machine.processing_time);

        MachineSnapshot {
            machine_id: machine.id,
            machine_name: machine.name.clone(),
            current_input,
            current_output,
            processing_status: status_for(total_processed, efficiency),
            efficiency,
        }
    }

    /// Snapshots for every active machine.
    pub fn classify_active(
        &self,
        store: &dyn ProductionStore,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<MachineSnapshot>> {
        let machines = store.list_machines(true)?;
        let mut snapshots = Vec::with_capacity(machines.len());

        for machine in &machines {
            let query = EventQuery::new()
                .machine(machine.id)
                .window(now - self.window, now);
            let events = store.query_events(&query)?;
            snapshots.push(self.classify(machine, &events, now));
        }

        Ok(snapshots)
    }
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self::new(Duration::minutes(5))
    }
}
