//! Dashboard API types.
//!
//! These types are used for JSON serialization in the REST and WebSocket APIs.

use chrono::{DateTime, Utc};
use prodline_core::{Machine, MachineId, ProductionEvent, RateEstimate};
use serde::{Deserialize, Serialize};

/// Live feed message, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    /// Recent events plus the positions of active machines.
    ProductionUpdate {
        /// Most recent events, newest first.
        production_data: Vec<ProductionEntry>,
        machine_status: Vec<MachinePosition>,
        timestamp: DateTime<Utc>,
    },
    /// Every rate estimate whose machine still exists.
    RatesUpdate {
        rates: Vec<RateEntry>,
        timestamp: DateTime<Utc>,
    },
}

/// Production event joined with its machine name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionEntry {
    pub machine_id: MachineId,
    /// `"Unknown"` when the machine no longer exists.
    pub machine_name: String,
    pub item_type: String,
    pub quantity: i64,
    pub timestamp: DateTime<Utc>,
}

impl ProductionEntry {
    pub const UNKNOWN_MACHINE: &'static str = "Unknown";

    pub fn new(event: &ProductionEvent, machine_name: Option<&str>) -> Self {
        Self {
            machine_id: event.machine_id,
            machine_name: machine_name.unwrap_or(Self::UNKNOWN_MACHINE).to_string(),
            item_type: event.item_type.clone(),
            quantity: event.quantity,
            timestamp: event.timestamp,
        }
    }
}

/// Canvas position of an active machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachinePosition {
    pub id: MachineId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub is_active: bool,
}

impl From<&Machine> for MachinePosition {
    fn from(machine: &Machine) -> Self {
        Self {
            id: machine.id,
            name: machine.name.clone(),
            x: machine.x,
            y: machine.y,
            is_active: machine.is_active,
        }
    }
}

/// Rate estimate joined with its machine name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub machine_id: MachineId,
    pub machine_name: String,
    pub item_type: String,
    pub rate_per_minute: f64,
    pub calculated_at: DateTime<Utc>,
}

impl RateEntry {
    pub fn new(estimate: RateEstimate, machine_name: &str) -> Self {
        Self {
            machine_id: estimate.machine_id,
            machine_name: machine_name.to_string(),
            item_type: estimate.item_type,
            rate_per_minute: estimate.rate_per_minute,
            calculated_at: estimate.calculated_at,
        }
    }
}

/// Plain `{"message": ...}` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body returned by the simulate endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulateResponse {
    pub message: String,
    pub rate_per_minute: f64,
}

/// Health check body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub subscribers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodline_core::{EventId, NewProductionEvent};

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-02T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_production_update_is_tagged() {
        let msg = FeedMessage::ProductionUpdate {
            production_data: vec![],
            machine_status: vec![],
            timestamp: ts(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "production_update");
        assert!(json["production_data"].is_array());
        assert!(json["machine_status"].is_array());
        assert_eq!(json["timestamp"], "2026-03-02T12:00:00Z");
    }

    #[test]
    fn test_rates_update_is_tagged() {
        let msg = FeedMessage::RatesUpdate {
            rates: vec![RateEntry::new(
                RateEstimate {
                    machine_id: MachineId(3),
                    item_type: "gear".to_string(),
                    rate_per_minute: 1.5,
                    calculated_at: ts(),
                },
                "Press",
            )],
            timestamp: ts(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "rates_update");
        assert_eq!(json["rates"][0]["machine_id"], 3);
        assert_eq!(json["rates"][0]["machine_name"], "Press");
        assert_eq!(json["rates"][0]["rate_per_minute"], 1.5);
    }

    #[test]
    fn test_production_entry_unknown_machine() {
        let event = ProductionEvent::from_new(
            EventId(1),
            NewProductionEvent::new(MachineId(9), "gear", 4, ts()),
        );

        let entry = ProductionEntry::new(&event, None);
        assert_eq!(entry.machine_name, "Unknown");
        assert_eq!(entry.quantity, 4);
    }
}
