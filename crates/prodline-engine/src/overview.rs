//! Fleet-level overview.

use prodline_core::OverviewSnapshot;
use prodline_store::ProductionStore;

use crate::error::EngineResult;

/// Aggregate machine and connection counts with the sum of every stored
/// rate estimate.
///
/// Estimates are summed regardless of their machine's state: an estimate
/// that is never refreshed keeps counting until it is overwritten.
pub fn overview(store: &dyn ProductionStore) -> EngineResult<OverviewSnapshot> {
    let machines = store.list_machines(false)?;
    let active_machines = machines.iter().filter(|m| m.is_active).count();
    let total_connections = store.count_connections()?;
    let total_items_per_minute = store
        .rate_estimates(None)?
        .iter()
        .map(|r| r.rate_per_minute)
        .sum();

    Ok(OverviewSnapshot {
        total_machines: machines.len(),
        active_machines,
        total_connections,
        total_items_per_minute,
    })
}
