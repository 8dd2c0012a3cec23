//! Raw production history for charting.

use chrono::{DateTime, Duration, Utc};
use prodline_core::MachineId;
use prodline_store::{EventQuery, ProductionStore, SortOrder};
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

/// One charted point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub quantity: i64,
}

/// Events of `machine_id` in `[now - hours, now]`, oldest first.
///
/// Non-positive `hours` clamps to a zero-length window; a span reaching
/// past the earliest representable time starts there instead.
pub fn history(
    store: &dyn ProductionStore,
    machine_id: MachineId,
    item_type: Option<&str>,
    hours: i64,
    now: DateTime<Utc>,
) -> EngineResult<Vec<HistoryPoint>> {
    let since = Duration::try_hours(hours.max(0))
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let mut query = EventQuery::new()
        .machine(machine_id)
        .window(since, now)
        .order(SortOrder::Ascending);
    if let Some(item_type) = item_type {
        query = query.item_type(item_type);
    }

    Ok(store
        .query_events(&query)?
        .into_iter()
        .map(|e| HistoryPoint {
            timestamp: e.timestamp,
            quantity: e.quantity,
        })
        .collect())
}
