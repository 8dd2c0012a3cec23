//! Production events and the rate estimates derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::machine::{Machine, MachineId};

/// Event log sequence number, assigned on append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

/// Which side of a machine an event's items flowed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    Input,
    Output,
}

impl fmt::Display for FlowDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

impl FromStr for FlowDirection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "input" => Ok(Self::Input),
            "output" => Ok(Self::Output),
            _ => Err(CoreError::InvalidDirection(s.to_string())),
        }
    }
}

/// An event that has not been appended to the log yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProductionEvent {
    pub machine_id: MachineId,
    pub item_type: String,
    pub quantity: i64,
    #[serde(default)]
    pub direction: Option<FlowDirection>,
    pub timestamp: DateTime<Utc>,
}

impl NewProductionEvent {
    pub fn new(
        machine_id: MachineId,
        item_type: impl Into<String>,
        quantity: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            machine_id,
            item_type: item_type.into(),
            quantity,
            direction: None,
            timestamp,
        }
    }

    /// Tag the event with an explicit flow direction.
    pub fn with_direction(mut self, direction: FlowDirection) -> Self {
        self.direction = Some(direction);
        self
    }
}

/// Immutable record of a quantity of items produced or consumed by a machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionEvent {
    pub id: EventId,
    pub machine_id: MachineId,
    pub item_type: String,
    pub quantity: i64,
    /// Explicit direction. Events recorded without one fall back to the
    /// machine's declared output items.
    #[serde(default)]
    pub direction: Option<FlowDirection>,
    pub timestamp: DateTime<Utc>,
}

impl ProductionEvent {
    pub fn from_new(id: EventId, event: NewProductionEvent) -> Self {
        Self {
            id,
            machine_id: event.machine_id,
            item_type: event.item_type,
            quantity: event.quantity,
            direction: event.direction,
            timestamp: event.timestamp,
        }
    }

    /// Resolve the flow direction of this event relative to `machine`.
    pub fn direction_for(&self, machine: &Machine) -> FlowDirection {
        match self.direction {
            Some(direction) => direction,
            None if machine.produces(&self.item_type) => FlowDirection::Output,
            None => FlowDirection::Input,
        }
    }
}

/// Latest throughput estimate for one `(machine, item_type)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEstimate {
    pub machine_id: MachineId,
    pub item_type: String,
    pub rate_per_minute: f64,
    pub calculated_at: DateTime<Utc>,
}
