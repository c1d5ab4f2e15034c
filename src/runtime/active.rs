use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use super::focus::InstanceId;
use super::shared_state::{PageResources, SharedStateError};

#[derive(Default)]
struct SlotInner {
    holder: Option<InstanceId>,
    evicted: HashSet<InstanceId>,
}

/// Tracks which listbox on a page is open. Claiming the slot evicts the
/// previous holder; the evicted instance closes itself when it next
/// reconciles.
#[derive(Default)]
pub struct ActiveInstanceSlot {
    inner: RwLock<SlotInner>,
}

impl ActiveInstanceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the slot for `instance`, returning the evicted holder if any.
    pub fn claim(&self, instance: &InstanceId) -> Option<InstanceId> {
        let mut guard = self.inner.write().ok()?;
        guard.evicted.remove(instance);
        let previous = guard.holder.replace(instance.clone());
        match previous {
            Some(prev) if &prev != instance => {
                guard.evicted.insert(prev.clone());
                Some(prev)
            }
            _ => None,
        }
    }

    /// Give the slot up, but only if `instance` still holds it.
    pub fn release(&self, instance: &InstanceId) {
        if let Ok(mut guard) = self.inner.write() {
            if guard.holder.as_ref() == Some(instance) {
                guard.holder = None;
            }
            guard.evicted.remove(instance);
        }
    }

    /// Consume a pending eviction notice for `instance`.
    pub fn take_eviction(&self, instance: &InstanceId) -> bool {
        self.inner
            .write()
            .map(|mut guard| guard.evicted.remove(instance))
            .unwrap_or(false)
    }

    pub fn holder(&self) -> Option<InstanceId> {
        self.inner.read().ok().and_then(|guard| guard.holder.clone())
    }
}

pub type SharedSlot = Arc<ActiveInstanceSlot>;

pub fn ensure_active_slot(resources: &PageResources) -> Result<SharedSlot, SharedStateError> {
    resources.get_or_insert_with::<ActiveInstanceSlot, _>(ActiveInstanceSlot::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_evicts_previous_holder() {
        let slot = ActiveInstanceSlot::new();
        let a = InstanceId::new("a");
        let b = InstanceId::new("b");

        assert_eq!(slot.claim(&a), None);
        assert_eq!(slot.claim(&b), Some(a.clone()));
        assert_eq!(slot.holder(), Some(b.clone()));
        assert!(slot.take_eviction(&a));
        assert!(!slot.take_eviction(&a));
        assert!(!slot.take_eviction(&b));
    }

    #[test]
    fn reclaim_by_holder_is_not_an_eviction() {
        let slot = ActiveInstanceSlot::new();
        let a = InstanceId::new("a");
        slot.claim(&a);
        assert_eq!(slot.claim(&a), None);
        assert!(!slot.take_eviction(&a));
    }

    #[test]
    fn release_by_other_owner_is_noop() {
        let slot = ActiveInstanceSlot::new();
        let a = InstanceId::new("a");
        slot.claim(&a);
        slot.release(&InstanceId::new("b"));
        assert_eq!(slot.holder(), Some(a.clone()));
        slot.release(&a);
        assert!(slot.holder().is_none());
    }
}
