//! Transition audit trail.
//!
//! The controller reports every state-machine decision here, including the
//! inputs it deliberately ignored. Hosts plug in a sink to log, buffer or
//! visualize the listbox's progression without touching the state machine.

use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use serde_json::Value;

/// Checkpoints reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStage {
    /// Options registered and initial selection resolved.
    Mounted,
    /// CLOSED -> OPEN.
    Opened,
    /// OPEN -> CLOSED, with or without a preceding commit.
    Closed,
    /// An option was committed; `Closed` follows.
    Committed,
    /// Focus moved between options while open.
    Navigated,
    /// An input arrived that the current state does not act on.
    Ignored,
    /// Listeners released; no further transitions.
    Unmounted,
}

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub timestamp: SystemTime,
    pub stage: AuditStage,
    pub details: Vec<(String, Value)>,
}

impl AuditEvent {
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

pub struct AuditEventBuilder {
    event: AuditEvent,
}

impl AuditEventBuilder {
    pub fn new(stage: AuditStage) -> Self {
        Self {
            event: AuditEvent {
                timestamp: SystemTime::now(),
                stage,
                details: Vec::new(),
            },
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.event.details.push((key.into(), value));
        self
    }

    pub fn finish(self) -> AuditEvent {
        self.event
    }
}

pub trait ListboxAudit: Send + Sync {
    fn record(&self, event: AuditEvent);
}

#[derive(Debug, Default)]
pub struct NullAudit;

impl ListboxAudit for NullAudit {
    fn record(&self, _event: AuditEvent) {}
}

/// Keeps events in memory; clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferedAudit {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl BufferedAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn stages(&self) -> Vec<AuditStage> {
        self.events().iter().map(|event| event.stage).collect()
    }
}

impl ListboxAudit for BufferedAudit {
    fn record(&self, event: AuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn buffered_audit_shares_events_across_clones() {
        let audit = BufferedAudit::new();
        let handle = audit.clone();
        handle.record(
            AuditEventBuilder::new(AuditStage::Committed)
                .detail("value", json!("b"))
                .finish(),
        );
        assert_eq!(audit.stages(), vec![AuditStage::Committed]);
        assert_eq!(audit.events()[0].detail("value"), Some(&json!("b")));
    }
}
