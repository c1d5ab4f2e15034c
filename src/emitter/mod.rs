//! Outbound notifications.
//!
//! A listbox publishes to its own listeners first and then bubbles the same
//! notification to the page's [`EventBus`], where ancestor listeners observe
//! every instance on the page.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::runtime::focus::InstanceId;
use crate::runtime::shared_state::{PageResources, SharedStateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Mounted and projected for the first time.
    Ready,
    /// A selection was committed.
    Change,
    /// Unmounted.
    Destroy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListboxNotification {
    pub kind: NotificationKind,
    pub source: String,
    pub value: String,
    pub bubbles: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Arc<dyn Fn(&ListboxNotification) + Send + Sync>;

/// Page-level listener list that instance notifications bubble into.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ListboxNotification) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut guard) = self.listeners.lock() {
            guard.push((id, Arc::new(listener)));
        }
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners
            .lock()
            .map(|mut guard| {
                let before = guard.len();
                guard.retain(|(existing, _)| *existing != id);
                guard.len() != before
            })
            .unwrap_or(false)
    }

    /// Listeners run outside the lock, so they may subscribe or unsubscribe.
    pub fn publish(&self, notification: &ListboxNotification) {
        let snapshot: Vec<Listener> = match self.listeners.lock() {
            Ok(guard) => guard.iter().map(|(_, l)| Arc::clone(l)).collect(),
            Err(_) => return,
        };
        for listener in snapshot {
            listener(notification);
        }
    }
}

pub type SharedBus = Arc<EventBus>;

pub fn ensure_event_bus(resources: &PageResources) -> Result<SharedBus, SharedStateError> {
    resources.get_or_insert_with::<EventBus, _>(EventBus::new)
}

/// Per-instance emitter.
pub struct EventEmitter {
    instance: InstanceId,
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
    ancestors: Option<SharedBus>,
}

impl EventEmitter {
    pub fn new(instance: InstanceId) -> Self {
        Self {
            instance,
            listeners: Vec::new(),
            next_id: 0,
            ancestors: None,
        }
    }

    pub fn with_ancestors(mut self, bus: SharedBus) -> Self {
        self.ancestors = Some(bus);
        self
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&ListboxNotification) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn notify_change(&self, value: &str) {
        self.dispatch(NotificationKind::Change, value);
    }

    pub fn notify_ready(&self, value: &str) {
        self.dispatch(NotificationKind::Ready, value);
    }

    pub fn notify_destroy(&self, value: &str) {
        self.dispatch(NotificationKind::Destroy, value);
    }

    /// Drop local listeners and detach from the page bus.
    pub fn release_all(&mut self) {
        self.listeners.clear();
        self.ancestors = None;
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn dispatch(&self, kind: NotificationKind, value: &str) {
        let notification = ListboxNotification {
            kind,
            source: self.instance.to_string(),
            value: value.to_string(),
            bubbles: true,
        };
        for (_, listener) in &self.listeners {
            listener(&notification);
        }
        if let Some(bus) = self.ancestors.as_ref() {
            bus.publish(&notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (
        Arc<Mutex<Vec<ListboxNotification>>>,
        impl Fn(&ListboxNotification) + Send + Sync + 'static,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |n: &ListboxNotification| {
            sink.lock().unwrap().push(n.clone())
        })
    }

    #[test]
    fn change_reaches_local_and_ancestor_listeners() {
        let bus = Arc::new(EventBus::new());
        let (local_seen, local) = recorder();
        let (page_seen, page) = recorder();
        bus.subscribe(page);

        let mut emitter =
            EventEmitter::new(InstanceId::new("fruit")).with_ancestors(Arc::clone(&bus));
        emitter.subscribe(local);
        emitter.notify_change("b");

        let local = local_seen.lock().unwrap();
        let page = page_seen.lock().unwrap();
        assert_eq!(local.len(), 1);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].kind, NotificationKind::Change);
        assert_eq!(page[0].source, "fruit");
        assert_eq!(page[0].value, "b");
        assert!(page[0].bubbles);
    }

    #[test]
    fn release_all_silences_emitter() {
        let bus = Arc::new(EventBus::new());
        let (page_seen, page) = recorder();
        bus.subscribe(page);
        let mut emitter = EventEmitter::new(InstanceId::new("x")).with_ancestors(bus);
        emitter.subscribe(|_| {});
        emitter.release_all();
        emitter.notify_change("a");
        assert_eq!(emitter.listener_count(), 0);
        assert!(page_seen.lock().unwrap().is_empty());
    }

    #[test]
    fn unsubscribe_removes_only_that_listener() {
        let mut emitter = EventEmitter::new(InstanceId::new("x"));
        let first = emitter.subscribe(|_| {});
        emitter.subscribe(|_| {});
        assert!(emitter.unsubscribe(first));
        assert!(!emitter.unsubscribe(first));
        assert_eq!(emitter.listener_count(), 1);
    }

    #[test]
    fn notification_serializes_with_lowercase_kind() {
        let notification = ListboxNotification {
            kind: NotificationKind::Ready,
            source: "x".to_string(),
            value: "a".to_string(),
            bubbles: true,
        };
        let json = serde_json::to_string(&notification).unwrap();
        assert!(json.contains("\"kind\":\"ready\""));
    }
}
