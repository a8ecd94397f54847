use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type SharedMetrics = Arc<Mutex<InputMetrics>>;

#[derive(Debug, Default, Clone)]
pub struct InputMetrics {
    events: u64,
    deliveries: u64,
    listener_failures: u64,
    back_presses: u64,
    back_captured: u64,
    modal_opens: u64,
    modal_replacements: u64,
    modal_closes: u64,
    node_snapshots: u64,
}

impl InputMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedMetrics {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn record_dispatch(&mut self, deliveries: usize, failures: usize) {
        self.events = self.events.saturating_add(1);
        self.deliveries = self.deliveries.saturating_add(deliveries as u64);
        self.listener_failures = self.listener_failures.saturating_add(failures as u64);
    }

    pub fn record_back(&mut self, captured: bool) {
        self.back_presses = self.back_presses.saturating_add(1);
        if captured {
            self.back_captured = self.back_captured.saturating_add(1);
        }
    }

    pub fn record_modal_open(&mut self, replaced: bool) {
        self.modal_opens = self.modal_opens.saturating_add(1);
        if replaced {
            self.modal_replacements = self.modal_replacements.saturating_add(1);
        }
    }

    pub fn record_modal_close(&mut self) {
        self.modal_closes = self.modal_closes.saturating_add(1);
    }

    pub fn record_node_snapshot(&mut self) {
        self.node_snapshots = self.node_snapshots.saturating_add(1);
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            events: self.events,
            deliveries: self.deliveries,
            listener_failures: self.listener_failures,
            back_presses: self.back_presses,
            back_captured: self.back_captured,
            modal_opens: self.modal_opens,
            modal_replacements: self.modal_replacements,
            modal_closes: self.modal_closes,
            node_snapshots: self.node_snapshots,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub events: u64,
    pub deliveries: u64,
    pub listener_failures: u64,
    pub back_presses: u64,
    pub back_captured: u64,
    pub modal_opens: u64,
    pub modal_replacements: u64,
    pub modal_closes: u64,
    pub node_snapshots: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "input_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("events".to_string(), json!(self.events));
        map.insert("deliveries".to_string(), json!(self.deliveries));
        map.insert(
            "listener_failures".to_string(),
            json!(self.listener_failures),
        );
        map.insert("back_presses".to_string(), json!(self.back_presses));
        map.insert("back_captured".to_string(), json!(self.back_captured));
        map.insert("modal_opens".to_string(), json!(self.modal_opens));
        map.insert(
            "modal_replacements".to_string(),
            json!(self.modal_replacements),
        );
        map.insert("modal_closes".to_string(), json!(self.modal_closes));
        map.insert("node_snapshots".to_string(), json!(self.node_snapshots));
        map
    }
}

/// Apply `update` to an optional shared metrics handle, skipping poisoned locks.
pub(crate) fn record(metrics: Option<&SharedMetrics>, update: impl FnOnce(&mut InputMetrics)) {
    if let Some(metrics) = metrics {
        if let Ok(mut guard) = metrics.lock() {
            update(&mut guard);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_into_snapshot() {
        let mut metrics = InputMetrics::new();
        metrics.record_dispatch(3, 1);
        metrics.record_dispatch(2, 0);
        metrics.record_back(true);
        metrics.record_back(false);
        metrics.record_modal_open(false);
        metrics.record_modal_open(true);
        metrics.record_modal_close();

        let snapshot = metrics.snapshot(Duration::from_millis(1500));
        assert_eq!(snapshot.uptime_ms, 1500);
        assert_eq!(snapshot.events, 2);
        assert_eq!(snapshot.deliveries, 5);
        assert_eq!(snapshot.listener_failures, 1);
        assert_eq!(snapshot.back_presses, 2);
        assert_eq!(snapshot.back_captured, 1);
        assert_eq!(snapshot.modal_opens, 2);
        assert_eq!(snapshot.modal_replacements, 1);
        assert_eq!(snapshot.modal_closes, 1);
    }

    #[test]
    fn snapshot_renders_log_event() {
        let snapshot = InputMetrics::new().snapshot(Duration::ZERO);
        let event = snapshot.to_log_event("tenfoot::runtime.metrics");
        assert_eq!(event.message, "input_metrics");
        assert_eq!(event.field("events"), Some(&json!(0)));
    }
}
