use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::time::Duration;

/// Counters accumulated by the host adapter across dispatch cycles.
#[derive(Debug, Default, Clone)]
pub struct ListboxMetrics {
    events: u64,
    opens: u64,
    closes: u64,
    commits: u64,
    renders: u64,
    renders_skipped: u64,
    keys_consumed: u64,
}

impl ListboxMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&mut self) {
        self.events = self.events.saturating_add(1);
    }

    pub fn record_open(&mut self) {
        self.opens = self.opens.saturating_add(1);
    }

    pub fn record_close(&mut self) {
        self.closes = self.closes.saturating_add(1);
    }

    pub fn record_commit(&mut self) {
        self.commits = self.commits.saturating_add(1);
    }

    pub fn record_render(&mut self, applied: bool) {
        if applied {
            self.renders = self.renders.saturating_add(1);
        } else {
            self.renders_skipped = self.renders_skipped.saturating_add(1);
        }
    }

    pub fn record_key_consumed(&mut self) {
        self.keys_consumed = self.keys_consumed.saturating_add(1);
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            events: self.events,
            opens: self.opens,
            closes: self.closes,
            commits: self.commits,
            renders: self.renders,
            renders_skipped: self.renders_skipped,
            keys_consumed: self.keys_consumed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub events: u64,
    pub opens: u64,
    pub closes: u64,
    pub commits: u64,
    pub renders: u64,
    pub renders_skipped: u64,
    pub keys_consumed: u64,
}

impl MetricSnapshot {
    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("events".to_string(), json!(self.events));
        map.insert("opens".to_string(), json!(self.opens));
        map.insert("closes".to_string(), json!(self.closes));
        map.insert("commits".to_string(), json!(self.commits));
        map.insert("renders".to_string(), json!(self.renders));
        map.insert("renders_skipped".to_string(), json!(self.renders_skipped));
        map.insert("keys_consumed".to_string(), json!(self.keys_consumed));
        map
    }

    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "listbox_metrics", self.as_fields())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_outcomes_split_into_applied_and_skipped() {
        let mut metrics = ListboxMetrics::new();
        metrics.record_render(true);
        metrics.record_render(false);
        metrics.record_render(false);
        let snap = metrics.snapshot(Duration::from_millis(5));
        assert_eq!(snap.renders, 1);
        assert_eq!(snap.renders_skipped, 2);
        assert_eq!(snap.uptime_ms, 5);
    }

    #[test]
    fn snapshot_event_carries_counters() {
        let mut metrics = ListboxMetrics::new();
        metrics.record_open();
        metrics.record_commit();
        let event = metrics
            .snapshot(Duration::ZERO)
            .to_log_event("listbox::runtime.metrics");
        assert_eq!(event.message, "listbox_metrics");
        assert_eq!(event.field("opens"), Some(&json!(1)));
        assert_eq!(event.field("commits"), Some(&json!(1)));
    }
}
