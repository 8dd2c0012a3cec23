//! Core domain types for the prodline production-line service.
//!
//! This crate provides the types shared by every other crate:
//! - `Machine`, `Connection`, `ItemType`: the line layout entities
//! - `ProductionEvent`, `RateEstimate`: the append-only event log and its derived rates
//! - `MachineSnapshot`, `OverviewSnapshot`: point-in-time derived views

pub mod error;
pub mod event;
pub mod machine;
pub mod snapshot;

pub use error::{CoreError, Result};
pub use event::{EventId, FlowDirection, NewProductionEvent, ProductionEvent, RateEstimate};
pub use machine::{
    Connection, ConnectionDraft, ConnectionId, ItemType, ItemTypeDraft, ItemTypeId, Machine,
    MachineDraft, MachineId, MachinePatch,
};
pub use snapshot::{MachineSnapshot, OverviewSnapshot, ProcessingStatus};
