//! Event log and entity store for prodline.
//!
//! The derivation engine only talks to the [`ProductionStore`] trait.
//! [`MemoryStore`] is the in-process implementation used by the service,
//! optionally backed by a JSON Lines journal so the event log survives
//! restarts.

pub mod error;
pub mod journal;
pub mod memory;
pub mod query;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use journal::EventJournal;
pub use memory::MemoryStore;
pub use query::{EventQuery, SortOrder};
pub use store::ProductionStore;
