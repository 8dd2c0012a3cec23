//! Production line layout entities.
//!
//! Machines sit on a 2D canvas and are linked by directed connections.
//! Item types are a catalogue of the item kinds flowing between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(pub u64);

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Item type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemTypeId(pub u64);

/// A machine placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub id: MachineId,
    pub name: String,
    /// Machine type label (e.g. "assembler").
    #[serde(rename = "type")]
    pub kind: String,
    /// Canvas X coordinate.
    pub x: f64,
    /// Canvas Y coordinate.
    pub y: f64,
    pub input_capacity: u32,
    pub output_capacity: u32,
    /// Seconds needed to process one unit.
    pub processing_time: f64,
    pub input_items: Vec<String>,
    pub output_items: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Machine {
    /// Whether `item_type` is declared as one of this machine's outputs.
    pub fn produces(&self, item_type: &str) -> bool {
        self.output_items.iter().any(|item| item == item_type)
    }
}

/// Request body for creating a machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub input_capacity: u32,
    pub output_capacity: u32,
    pub processing_time: f64,
    #[serde(default)]
    pub input_items: Vec<String>,
    #[serde(default)]
    pub output_items: Vec<String>,
}

impl MachineDraft {
    /// Materialize the draft with a store-assigned id.
    pub fn into_machine(self, id: MachineId, created_at: DateTime<Utc>) -> Machine {
        Machine {
            id,
            name: self.name,
            kind: self.kind,
            x: self.x,
            y: self.y,
            input_capacity: self.input_capacity,
            output_capacity: self.output_capacity,
            processing_time: self.processing_time,
            input_items: self.input_items,
            output_items: self.output_items,
            is_active: true,
            created_at,
        }
    }
}

/// Partial update of a machine. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MachinePatch {
    pub name: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub input_capacity: Option<u32>,
    pub output_capacity: Option<u32>,
    pub processing_time: Option<f64>,
    pub input_items: Option<Vec<String>>,
    pub output_items: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl MachinePatch {
    /// Apply every present field to `machine`.
    pub fn apply(self, machine: &mut Machine) {
        if let Some(name) = self.name {
            machine.name = name;
        }
        if let Some(x) = self.x {
            machine.x = x;
        }
        if let Some(y) = self.y {
            machine.y = y;
        }
        if let Some(capacity) = self.input_capacity {
            machine.input_capacity = capacity;
        }
        if let Some(capacity) = self.output_capacity {
            machine.output_capacity = capacity;
        }
        if let Some(processing_time) = self.processing_time {
            machine.processing_time = processing_time;
        }
        if let Some(items) = self.input_items {
            machine.input_items = items;
        }
        if let Some(items) = self.output_items {
            machine.output_items = items;
        }
        if let Some(is_active) = self.is_active {
            machine.is_active = is_active;
        }
    }
}

/// Directed edge from one machine's output slot to another's input slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub source_machine_id: MachineId,
    pub target_machine_id: MachineId,
    pub source_output_index: u32,
    pub target_input_index: u32,
    pub created_at: DateTime<Utc>,
}

impl Connection {
    /// Whether this connection touches `machine_id` on either end.
    pub fn touches(&self, machine_id: MachineId) -> bool {
        self.source_machine_id == machine_id || self.target_machine_id == machine_id
    }
}

/// Request body for creating a connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDraft {
    pub source_machine_id: MachineId,
    pub target_machine_id: MachineId,
    #[serde(default)]
    pub source_output_index: u32,
    #[serde(default)]
    pub target_input_index: u32,
}

/// Catalogue entry for an item kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemType {
    pub id: ItemTypeId,
    pub name: String,
    /// Display color used by the frontend.
    pub color: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating an item type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemTypeDraft {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
}
