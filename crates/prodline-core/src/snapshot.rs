//! Derived, point-in-time views over the event log.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::machine::MachineId;

/// Live operational status of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingStatus {
    /// Nothing processed in the window.
    Idle,
    /// Efficiency at or above 80%.
    HighEfficiency,
    /// Efficiency at or above 50%.
    Normal,
    /// Efficiency below 50%.
    LowEfficiency,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::HighEfficiency => "high-efficiency",
            Self::Normal => "normal",
            Self::LowEfficiency => "low-efficiency",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one active machine over the trailing status window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub machine_id: MachineId,
    pub machine_name: String,
    /// Summed absolute input quantity per item type.
    pub current_input: BTreeMap<String, i64>,
    /// Summed output quantity per item type.
    pub current_output: BTreeMap<String, i64>,
    pub processing_status: ProcessingStatus,
    /// Actual over theoretical throughput, percent, capped at 100.
    pub efficiency: f64,
}

/// Fleet-level summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewSnapshot {
    pub total_machines: usize,
    pub active_machines: usize,
    pub total_connections: usize,
    /// Sum over every stored rate estimate, whatever the machine's state.
    pub total_items_per_minute: f64,
}
