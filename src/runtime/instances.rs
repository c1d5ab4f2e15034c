use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::focus::InstanceId;
use super::shared_state::{PageResources, SharedStateError};

#[derive(Default)]
struct NamesInner {
    taken: HashSet<InstanceId>,
    next_generated: u64,
}

/// Instance identities currently mounted on a page. Focus and the active
/// slot tell widgets apart by id alone, so two live instances never share one.
#[derive(Default)]
pub struct InstanceNames {
    inner: Mutex<NamesInner>,
}

impl InstanceNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `requested`, or the next free `listbox-{n}` when `None`.
    /// Returns `None` if the requested id is already mounted.
    pub fn reserve(&self, requested: Option<&str>) -> Option<InstanceId> {
        let mut guard = self.inner.lock().ok()?;
        let id = match requested {
            Some(name) => InstanceId::new(name),
            None => loop {
                guard.next_generated += 1;
                let candidate = InstanceId::new(format!("listbox-{}", guard.next_generated));
                if !guard.taken.contains(&candidate) {
                    break candidate;
                }
            },
        };
        guard.taken.insert(id.clone()).then_some(id)
    }

    pub fn release(&self, id: &InstanceId) -> bool {
        self.inner
            .lock()
            .map(|mut guard| guard.taken.remove(id))
            .unwrap_or(false)
    }

    pub fn is_taken(&self, id: &InstanceId) -> bool {
        self.inner
            .lock()
            .map(|guard| guard.taken.contains(id))
            .unwrap_or(false)
    }
}

pub type SharedNames = Arc<InstanceNames>;

pub fn ensure_instance_names(resources: &PageResources) -> Result<SharedNames, SharedStateError> {
    resources.get_or_insert_with::<InstanceNames, _>(InstanceNames::new)
}
