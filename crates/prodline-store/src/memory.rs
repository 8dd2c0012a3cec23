//! In-memory store.

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use prodline_core::{
    Connection, ConnectionDraft, ConnectionId, EventId, ItemType, ItemTypeDraft, ItemTypeId,
    Machine, MachineDraft, MachineId, MachinePatch, NewProductionEvent, ProductionEvent,
    RateEstimate,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::journal::EventJournal;
use crate::query::EventQuery;
use crate::store::ProductionStore;

type RateKey = (MachineId, String);

/// Process-local store.
///
/// Entities live in ordered maps behind `RwLock`s; rate estimates live in a
/// `DashMap` keyed by `(machine_id, item_type)` so that each upsert replaces
/// the row atomically.
pub struct MemoryStore {
    machines: RwLock<BTreeMap<MachineId, Machine>>,
    connections: RwLock<BTreeMap<ConnectionId, Connection>>,
    item_types: RwLock<BTreeMap<ItemTypeId, ItemType>>,
    events: RwLock<Vec<ProductionEvent>>,
    rates: DashMap<RateKey, RateEstimate>,
    journal: Option<Mutex<EventJournal>>,
    next_machine_id: AtomicU64,
    next_connection_id: AtomicU64,
    next_item_type_id: AtomicU64,
    next_event_id: AtomicU64,
}

impl MemoryStore {
    /// Create an empty, non-durable store.
    pub fn new() -> Self {
        Self {
            machines: RwLock::new(BTreeMap::new()),
            connections: RwLock::new(BTreeMap::new()),
            item_types: RwLock::new(BTreeMap::new()),
            events: RwLock::new(Vec::new()),
            rates: DashMap::new(),
            journal: None,
            next_machine_id: AtomicU64::new(1),
            next_connection_id: AtomicU64::new(1),
            next_item_type_id: AtomicU64::new(1),
            next_event_id: AtomicU64::new(1),
        }
    }

    /// Create a store whose event log is replayed from, and appended to,
    /// the journal at `path`.
    ///
    /// Only events are journaled. Machine ids resume above every id the
    /// replayed log mentions so a new machine never inherits old events.
    pub fn with_journal(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let events = EventJournal::replay(path)?;
        let next_id = events.iter().map(|e| e.id.0).max().unwrap_or(0) + 1;
        let next_machine_id = events.iter().map(|e| e.machine_id.0).max().unwrap_or(0) + 1;
        let journal = EventJournal::open(path)?;

        info!(
            path = %path.display(),
            events = events.len(),
            next_event_id = next_id,
            next_machine_id,
            "Event log restored from journal"
        );

        let mut store = Self::new();
        store.events = RwLock::new(events);
        store.next_event_id = AtomicU64::new(next_id);
        store.next_machine_id = AtomicU64::new(next_machine_id);
        store.journal = Some(Mutex::new(journal));
        Ok(store)
    }

    /// Total number of events in the log.
    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductionStore for MemoryStore {
    fn append_event(&self, event: NewProductionEvent) -> StoreResult<ProductionEvent> {
        // Held across the journal write so file order matches id order.
        let mut events = self.events.write();
        let id = EventId(self.next_event_id.fetch_add(1, Ordering::Relaxed));
        let event = ProductionEvent::from_new(id, event);

        if let Some(journal) = &self.journal {
            journal.lock().append(&event)?;
        }

        events.push(event.clone());
        debug!(
            event_id = id.0,
            machine_id = %event.machine_id,
            item_type = %event.item_type,
            quantity = event.quantity,
            "Production event appended"
        );
        Ok(event)
    }

    fn query_events(&self, query: &EventQuery) -> StoreResult<Vec<ProductionEvent>> {
        let events = self.events.read();
        Ok(query.apply(events.iter()))
    }

    fn upsert_rate_estimate(&self, estimate: RateEstimate) -> StoreResult<()> {
        let key = (estimate.machine_id, estimate.item_type.clone());
        self.rates.insert(key, estimate);
        Ok(())
    }

    fn rate_estimates(&self, machine_id: Option<MachineId>) -> StoreResult<Vec<RateEstimate>> {
        let mut estimates: Vec<RateEstimate> = self
            .rates
            .iter()
            .filter(|entry| machine_id.map_or(true, |id| entry.key().0 == id))
            .map(|entry| entry.value().clone())
            .collect();
        estimates.sort_by(|a, b| {
            (a.machine_id, &a.item_type).cmp(&(b.machine_id, &b.item_type))
        });
        Ok(estimates)
    }

    fn list_machines(&self, active_only: bool) -> StoreResult<Vec<Machine>> {
        Ok(self
            .machines
            .read()
            .values()
            .filter(|m| !active_only || m.is_active)
            .cloned()
            .collect())
    }

    fn get_machine(&self, id: MachineId) -> StoreResult<Option<Machine>> {
        Ok(self.machines.read().get(&id).cloned())
    }

    fn create_machine(&self, draft: MachineDraft) -> StoreResult<Machine> {
        let id = MachineId(self.next_machine_id.fetch_add(1, Ordering::Relaxed));
        let machine = draft.into_machine(id, Utc::now());
        self.machines.write().insert(id, machine.clone());
        info!(machine_id = %id, name = %machine.name, "Machine created");
        Ok(machine)
    }

    fn update_machine(&self, id: MachineId, patch: MachinePatch) -> StoreResult<Machine> {
        let mut machines = self.machines.write();
        let machine = machines
            .get_mut(&id)
            .ok_or(StoreError::MachineNotFound(id))?;
        patch.apply(machine);
        debug!(machine_id = %id, x = machine.x, y = machine.y, "Machine updated");
        Ok(machine.clone())
    }

    fn delete_machine(&self, id: MachineId) -> StoreResult<()> {
        let mut machines = self.machines.write();
        let mut connections = self.connections.write();

        if machines.remove(&id).is_none() {
            return Err(StoreError::MachineNotFound(id));
        }
        let before = connections.len();
        connections.retain(|_, c| !c.touches(id));

        info!(
            machine_id = %id,
            connections_removed = before - connections.len(),
            "Machine deleted"
        );
        Ok(())
    }

    fn delete_all_machines(&self) -> StoreResult<usize> {
        let mut machines = self.machines.write();
        let mut connections = self.connections.write();

        let deleted = machines.len();
        connections.clear();
        machines.clear();

        info!(deleted, "All machines deleted");
        Ok(deleted)
    }

    fn count_connections(&self) -> StoreResult<usize> {
        Ok(self.connections.read().len())
    }

    fn list_connections(&self) -> StoreResult<Vec<Connection>> {
        Ok(self.connections.read().values().cloned().collect())
    }

    fn create_connection(&self, draft: ConnectionDraft) -> StoreResult<Connection> {
        let machines = self.machines.read();
        for id in [draft.source_machine_id, draft.target_machine_id] {
            if !machines.contains_key(&id) {
                return Err(StoreError::MachineNotFound(id));
            }
        }

        let mut connections = self.connections.write();
        let duplicate = connections.values().any(|c| {
            c.source_machine_id == draft.source_machine_id
                && c.target_machine_id == draft.target_machine_id
        });
        if duplicate {
            return Err(StoreError::Conflict("Connection already exists".to_string()));
        }

        let id = ConnectionId(self.next_connection_id.fetch_add(1, Ordering::Relaxed));
        let connection = Connection {
            id,
            source_machine_id: draft.source_machine_id,
            target_machine_id: draft.target_machine_id,
            source_output_index: draft.source_output_index,
            target_input_index: draft.target_input_index,
            created_at: Utc::now(),
        };
        connections.insert(id, connection.clone());
        info!(
            connection_id = %id,
            source = %connection.source_machine_id,
            target = %connection.target_machine_id,
            "Connection created"
        );
        Ok(connection)
    }

    fn delete_connection(&self, id: ConnectionId) -> StoreResult<()> {
        self.connections
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::ConnectionNotFound(id))
    }

    fn list_item_types(&self) -> StoreResult<Vec<ItemType>> {
        Ok(self.item_types.read().values().cloned().collect())
    }

    fn create_item_type(&self, draft: ItemTypeDraft) -> StoreResult<ItemType> {
        let mut item_types = self.item_types.write();
        if item_types.values().any(|t| t.name == draft.name) {
            return Err(StoreError::Conflict(format!(
                "Item type already exists: {}",
                draft.name
            )));
        }

        let id = ItemTypeId(self.next_item_type_id.fetch_add(1, Ordering::Relaxed));
        let item_type = ItemType {
            id,
            name: draft.name,
            color: draft.color,
            description: draft.description,
            created_at: Utc::now(),
        };
        item_types.insert(id, item_type.clone());
        Ok(item_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn draft(name: &str) -> MachineDraft {
        MachineDraft {
            name: name.to_string(),
            kind: "assembler".to_string(),
            x: 0.0,
            y: 0.0,
            input_capacity: 2,
            output_capacity: 1,
            processing_time: 2.0,
            input_items: vec!["plate".to_string()],
            output_items: vec!["gear".to_string()],
        }
    }

    fn connect(source: MachineId, target: MachineId) -> ConnectionDraft {
        ConnectionDraft {
            source_machine_id: source,
            target_machine_id: target,
            source_output_index: 0,
            target_input_index: 0,
        }
    }

    #[test]
    fn test_append_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let a = store
            .append_event(NewProductionEvent::new(MachineId(1), "gear", 5, now))
            .unwrap();
        let b = store
            .append_event(NewProductionEvent::new(MachineId(1), "gear", 5, now))
            .unwrap();
        assert_eq!(a.id, EventId(1));
        assert_eq!(b.id, EventId(2));
        assert_eq!(store.event_count(), 2);
    }

    #[test]
    fn test_upsert_replaces_per_key() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for rate in [1.0, 2.5] {
            store
                .upsert_rate_estimate(RateEstimate {
                    machine_id: MachineId(1),
                    item_type: "gear".to_string(),
                    rate_per_minute: rate,
                    calculated_at: now,
                })
                .unwrap();
        }
        store
            .upsert_rate_estimate(RateEstimate {
                machine_id: MachineId(2),
                item_type: "gear".to_string(),
                rate_per_minute: 4.0,
                calculated_at: now,
            })
            .unwrap();

        let all = store.rate_estimates(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].rate_per_minute, 2.5);

        let one = store.rate_estimates(Some(MachineId(2))).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].rate_per_minute, 4.0);
    }

    #[test]
    fn test_active_filter() {
        let store = MemoryStore::new();
        let a = store.create_machine(draft("A")).unwrap();
        store.create_machine(draft("B")).unwrap();
        store
            .update_machine(
                a.id,
                MachinePatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(store.list_machines(false).unwrap().len(), 2);
        let active = store.list_machines(true).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "B");
    }

    #[test]
    fn test_delete_machine_cascades_connections() {
        let store = MemoryStore::new();
        let a = store.create_machine(draft("A")).unwrap();
        let b = store.create_machine(draft("B")).unwrap();
        let c = store.create_machine(draft("C")).unwrap();
        store.create_connection(connect(a.id, b.id)).unwrap();
        store.create_connection(connect(b.id, c.id)).unwrap();
        store.create_connection(connect(a.id, c.id)).unwrap();

        store.delete_machine(b.id).unwrap();
        assert_eq!(store.count_connections().unwrap(), 1);
        assert!(matches!(
            store.delete_machine(b.id),
            Err(StoreError::MachineNotFound(_))
        ));
    }

    #[test]
    fn test_delete_all_machines() {
        let store = MemoryStore::new();
        let a = store.create_machine(draft("A")).unwrap();
        let b = store.create_machine(draft("B")).unwrap();
        store.create_connection(connect(a.id, b.id)).unwrap();

        assert_eq!(store.delete_all_machines().unwrap(), 2);
        assert!(store.list_machines(false).unwrap().is_empty());
        assert_eq!(store.count_connections().unwrap(), 0);
    }

    #[test]
    fn test_connection_validation() {
        let store = MemoryStore::new();
        let a = store.create_machine(draft("A")).unwrap();
        let b = store.create_machine(draft("B")).unwrap();

        let missing = store.create_connection(connect(a.id, MachineId(99)));
        assert!(matches!(missing, Err(StoreError::MachineNotFound(MachineId(99)))));

        store.create_connection(connect(a.id, b.id)).unwrap();
        let dup = store.create_connection(connect(a.id, b.id));
        assert!(matches!(dup, Err(StoreError::Conflict(_))));

        // Reverse direction is a different edge.
        assert!(store.create_connection(connect(b.id, a.id)).is_ok());
    }

    #[test]
    fn test_delete_connection() {
        let store = MemoryStore::new();
        let a = store.create_machine(draft("A")).unwrap();
        let b = store.create_machine(draft("B")).unwrap();
        let conn = store.create_connection(connect(a.id, b.id)).unwrap();

        store.delete_connection(conn.id).unwrap();
        let err = store.delete_connection(conn.id).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_item_type_names_are_unique() {
        let store = MemoryStore::new();
        let gear = ItemTypeDraft {
            name: "gear".to_string(),
            color: "#ff0000".to_string(),
            description: None,
        };
        store.create_item_type(gear.clone()).unwrap();
        assert!(matches!(
            store.create_item_type(gear),
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(store.list_item_types().unwrap().len(), 1);
    }

    #[test]
    fn test_journal_restores_event_log() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.jsonl");
        let now = Utc::now();

        {
            let store = MemoryStore::with_journal(&path).unwrap();
            store
                .append_event(NewProductionEvent::new(MachineId(1), "gear", 4, now))
                .unwrap();
            store
                .append_event(NewProductionEvent::new(
                    MachineId(1),
                    "gear",
                    6,
                    now - Duration::minutes(1),
                ))
                .unwrap();
        }

        let store = MemoryStore::with_journal(&path).unwrap();
        assert_eq!(store.event_count(), 2);

        let next = store
            .append_event(NewProductionEvent::new(MachineId(1), "gear", 1, now))
            .unwrap();
        assert_eq!(next.id, EventId(3), "Ids continue after replay");
    }

    #[test]
    fn test_machine_created_after_replay_has_no_history() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.jsonl");
        let now = Utc::now();

        {
            let store = MemoryStore::with_journal(&path).unwrap();
            let press = store.create_machine(draft("Press")).unwrap();
            store
                .append_event(NewProductionEvent::new(press.id, "gear", 150, now))
                .unwrap();
        }

        let store = MemoryStore::with_journal(&path).unwrap();
        let fresh = store.create_machine(draft("BrandNew")).unwrap();
        assert_eq!(fresh.id, MachineId(2));

        let events = store
            .query_events(&EventQuery::new().machine(fresh.id))
            .unwrap();
        assert!(events.is_empty());
    }
}
