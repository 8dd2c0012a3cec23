//! Dashboard state management.
//!
//! DashboardState builds the live feed payloads from the engine's store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use prodline_core::{Machine, MachineId};
use prodline_engine::{EngineResult, ProductionEngine};
use prodline_store::{EventQuery, SortOrder};

use crate::registry::Topic;
use crate::types::{FeedMessage, MachinePosition, ProductionEntry, RateEntry};

/// Read side shared by the feed tasks and the HTTP handlers.
#[derive(Debug, Clone)]
pub struct DashboardState {
    engine: ProductionEngine,
    /// Events carried by each production update.
    recent_events_limit: usize,
}

impl DashboardState {
    pub fn new(engine: ProductionEngine, recent_events_limit: usize) -> Self {
        Self {
            engine,
            recent_events_limit,
        }
    }

    pub fn engine(&self) -> &ProductionEngine {
        &self.engine
    }

    /// Most recent events joined with machine names, plus active machine
    /// positions.
    pub fn production_update(&self, now: DateTime<Utc>) -> EngineResult<FeedMessage> {
        let store = self.engine.store();
        let machines = store.list_machines(false)?;
        let names = name_index(&machines);

        let query = EventQuery::new()
            .limit(self.recent_events_limit)
            .order(SortOrder::Descending);
        let production_data = store
            .query_events(&query)?
            .iter()
            .map(|event| {
                ProductionEntry::new(event, names.get(&event.machine_id).copied())
            })
            .collect();

        let machine_status = machines
            .iter()
            .filter(|m| m.is_active)
            .map(MachinePosition::from)
            .collect();

        Ok(FeedMessage::ProductionUpdate {
            production_data,
            machine_status,
            timestamp: now,
        })
    }

    /// Every rate estimate whose machine still exists.
    pub fn rates_update(&self, now: DateTime<Utc>) -> EngineResult<FeedMessage> {
        Ok(FeedMessage::RatesUpdate {
            rates: self.rate_entries(None)?,
            timestamp: now,
        })
    }

    /// Rate estimates joined with machine names, optionally for one machine.
    ///
    /// Estimates of deleted machines are skipped.
    pub fn rate_entries(&self, machine_id: Option<MachineId>) -> EngineResult<Vec<RateEntry>> {
        let store = self.engine.store();
        let machines = store.list_machines(false)?;
        let names = name_index(&machines);

        Ok(store
            .rate_estimates(machine_id)?
            .into_iter()
            .filter_map(|estimate| {
                let name = names.get(&estimate.machine_id).copied()?;
                Some(RateEntry::new(estimate, name))
            })
            .collect())
    }

    /// Payload for one topic.
    pub fn update_for(&self, topic: Topic, now: DateTime<Utc>) -> EngineResult<FeedMessage> {
        match topic {
            Topic::Production => self.production_update(now),
            Topic::Rates => self.rates_update(now),
        }
    }
}

fn name_index(machines: &[Machine]) -> HashMap<MachineId, &str> {
    machines
        .iter()
        .map(|m| (m.id, m.name.as_str()))
        .collect()
}
