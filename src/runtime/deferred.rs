use std::collections::VecDeque;

use crate::registry::OptionId;

/// Work postponed until the current dispatch cycle finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deferred {
    /// Move focus onto an option, provided the list is still open.
    FocusOption(OptionId),
    /// Announce that the listbox finished mounting.
    Ready,
}

/// "Run after the current dispatch cycle" queue. The only way to drop
/// scheduled work without running it is [`DispatchQueue::cancel_all`],
/// which unmount calls.
#[derive(Debug, Default)]
pub struct DispatchQueue {
    pending: VecDeque<Deferred>,
    closed: bool,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `work`; returns `false` once the queue has been cancelled.
    pub fn schedule(&mut self, work: Deferred) -> bool {
        if self.closed {
            return false;
        }
        self.pending.push_back(work);
        true
    }

    /// Hand over everything scheduled so far, in scheduling order.
    pub fn drain(&mut self) -> Vec<Deferred> {
        self.pending.drain(..).collect()
    }

    /// Discard pending work and refuse new work. Returns how much was dropped.
    pub fn cancel_all(&mut self) -> usize {
        self.closed = true;
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{OptionDecl, OptionRegistry};

    fn ids() -> (OptionId, OptionId) {
        let registry =
            OptionRegistry::scan([OptionDecl::new("A"), OptionDecl::new("B")]).unwrap();
        (registry.first().id, registry.last().id)
    }

    #[test]
    fn drains_in_schedule_order() {
        let (a, b) = ids();
        let mut queue = DispatchQueue::new();
        queue.schedule(Deferred::FocusOption(a));
        queue.schedule(Deferred::FocusOption(b));
        assert_eq!(
            queue.drain(),
            vec![Deferred::FocusOption(a), Deferred::FocusOption(b)]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn cancel_drops_pending_and_rejects_new_work() {
        let (a, _) = ids();
        let mut queue = DispatchQueue::new();
        queue.schedule(Deferred::FocusOption(a));
        assert_eq!(queue.cancel_all(), 1);
        assert!(!queue.schedule(Deferred::FocusOption(a)));
        assert!(queue.drain().is_empty());
    }
}
