//! Store abstraction consumed by the derivation engine and the HTTP layer.

use prodline_core::{
    Connection, ConnectionDraft, ConnectionId, ItemType, ItemTypeDraft, Machine, MachineDraft,
    MachineId, MachinePatch, NewProductionEvent, ProductionEvent, RateEstimate,
};

use crate::error::StoreResult;
use crate::query::EventQuery;

/// Persistence for machines, connections, item types, the production event
/// log and the per-pair rate estimates.
///
/// Calls are synchronous and expected to be short; implementations handle
/// their own locking.
pub trait ProductionStore: Send + Sync {
    // --- Event log ---

    /// Append an event and return it with its assigned id.
    fn append_event(&self, event: NewProductionEvent) -> StoreResult<ProductionEvent>;

    /// Range query over the event log.
    fn query_events(&self, query: &EventQuery) -> StoreResult<Vec<ProductionEvent>>;

    // --- Rate estimates ---

    /// Insert or replace the estimate for `(machine_id, item_type)`.
    fn upsert_rate_estimate(&self, estimate: RateEstimate) -> StoreResult<()>;

    /// All estimates, or only those of one machine.
    fn rate_estimates(&self, machine_id: Option<MachineId>) -> StoreResult<Vec<RateEstimate>>;

    // --- Machines ---

    fn list_machines(&self, active_only: bool) -> StoreResult<Vec<Machine>>;

    fn get_machine(&self, id: MachineId) -> StoreResult<Option<Machine>>;

    fn create_machine(&self, draft: MachineDraft) -> StoreResult<Machine>;

    fn update_machine(&self, id: MachineId, patch: MachinePatch) -> StoreResult<Machine>;

    /// Delete a machine and every connection touching it.
    fn delete_machine(&self, id: MachineId) -> StoreResult<()>;

    /// Delete every machine and connection, returning the machine count.
    fn delete_all_machines(&self) -> StoreResult<usize>;

    // --- Connections ---

    fn count_connections(&self) -> StoreResult<usize>;

    fn list_connections(&self) -> StoreResult<Vec<Connection>>;

    fn create_connection(&self, draft: ConnectionDraft) -> StoreResult<Connection>;

    fn delete_connection(&self, id: ConnectionId) -> StoreResult<()>;

    // --- Item types ---

    fn list_item_types(&self) -> StoreResult<Vec<ItemType>>;

    fn create_item_type(&self, draft: ItemTypeDraft) -> StoreResult<ItemType>;

    /// Look up a machine, failing with `MachineNotFound` when absent.
    fn require_machine(&self, id: MachineId) -> StoreResult<Machine> {
        self.get_machine(id)?
            .ok_or(crate::error::StoreError::MachineNotFound(id))
    }
}
