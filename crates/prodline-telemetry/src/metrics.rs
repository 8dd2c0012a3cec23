//! Prometheus metrics for prodline.
//!
//! Covers:
//! - Production events appended to the log
//! - Rate estimate recomputations
//! - Live feed broadcasts and subscriber churn
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means a duplicate metric
//! name, which is a startup bug; it only happens on first access of each
//! static, never on the hot path.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_int_counter, register_int_gauge, CounterVec, Encoder,
    IntCounter, IntGauge, TextEncoder,
};

use crate::error::TelemetryResult;

/// Total production events appended.
pub static EVENTS_APPENDED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "prodline_events_appended_total",
        "Total production events appended to the event log"
    )
    .unwrap()
});

/// Total rate estimate recomputations.
pub static RATE_RECOMPUTE_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "prodline_rate_recompute_total",
        "Total rate estimate recomputations"
    )
    .unwrap()
});

/// Broadcasts per feed.
/// Labels: feed (production/rates)
pub static BROADCAST_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "prodline_broadcast_total",
        "Total live feed broadcasts",
        &["feed"]
    )
    .unwrap()
});

/// Subscribers dropped because a send to them failed.
pub static SUBSCRIBER_SEND_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "prodline_subscriber_send_failures_total",
        "Subscribers removed after a failed send"
    )
    .unwrap()
});

/// Live feed subscribers currently registered.
pub static SUBSCRIBERS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "prodline_subscribers",
        "Live feed subscribers currently registered"
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record a production event appended.
    pub fn event_appended() {
        EVENTS_APPENDED_TOTAL.inc();
    }

    /// Record a rate estimate recomputation.
    pub fn rate_recomputed() {
        RATE_RECOMPUTE_TOTAL.inc();
    }

    /// Record a broadcast on `feed`.
    pub fn broadcast(feed: &str) {
        BROADCAST_TOTAL.with_label_values(&[feed]).inc();
    }

    /// Record subscribers removed after failed sends.
    pub fn subscriber_send_failures(count: usize) {
        SUBSCRIBER_SEND_FAILURES_TOTAL.inc_by(count as u64);
    }

    /// Set the current subscriber count.
    pub fn subscribers(count: usize) {
        SUBSCRIBERS.set(count as i64);
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
