//! Event log range queries.

use chrono::{DateTime, Utc};
use prodline_core::{MachineId, ProductionEvent};

/// Timestamp ordering of query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Filter over the event log. Every bound is optional and inclusive.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub machine_id: Option<MachineId>,
    pub item_type: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub order: SortOrder,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn machine(mut self, machine_id: MachineId) -> Self {
        self.machine_id = Some(machine_id);
        self
    }

    pub fn item_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = Some(item_type.into());
        self
    }

    /// Restrict to events inside `[since, until]`.
    pub fn window(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Check whether `event` passes every filter (limit and order aside).
    pub fn matches(&self, event: &ProductionEvent) -> bool {
        if let Some(machine_id) = self.machine_id {
            if event.machine_id != machine_id {
                return false;
            }
        }
        if let Some(item_type) = &self.item_type {
            if &event.item_type != item_type {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if event.timestamp > until {
                return false;
            }
        }
        true
    }

    /// Apply filters, ordering and limit to a slice of events.
    ///
    /// Ties on timestamp are broken by event id so results are stable. Only
    /// the events that survive the limit are cloned.
    pub fn apply<'a, I>(&self, events: I) -> Vec<ProductionEvent>
    where
        I: IntoIterator<Item = &'a ProductionEvent>,
    {
        let mut selected: Vec<&ProductionEvent> = events
            .into_iter()
            .filter(|event| self.matches(event))
            .collect();

        let order = self.order;
        let compare = |a: &&ProductionEvent, b: &&ProductionEvent| {
            let ordering = (a.timestamp, a.id).cmp(&(b.timestamp, b.id));
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        };

        if let Some(limit) = self.limit {
            if limit == 0 {
                return Vec::new();
            }
            if limit < selected.len() {
                selected.select_nth_unstable_by(limit - 1, compare);
                selected.truncate(limit);
            }
        }
        selected.sort_unstable_by(compare);
        selected.into_iter().cloned().collect()
    }
}
