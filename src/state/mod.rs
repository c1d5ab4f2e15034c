//! Authoritative selection state of one listbox.
//!
//! Readers get `&SelectionState`; only the controller holds the mutable
//! handle, and it mutates exclusively through the transition methods below.

use crate::registry::{ListOption, OptionId, OptionRegistry};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionState {
    current: OptionId,
    is_open: bool,
    placeholder: Option<String>,
    has_committed_once: bool,
}

impl SelectionState {
    pub(crate) fn new(current: OptionId, placeholder: Option<String>) -> Self {
        Self {
            current,
            is_open: false,
            placeholder,
            has_committed_once: false,
        }
    }

    pub fn current(&self) -> OptionId {
        self.current
    }

    /// Resolve the current option. The registry is immutable while mounted,
    /// so this only fails when handed a registry from another instance.
    pub fn current_option<'r>(&self, registry: &'r OptionRegistry) -> Option<&'r ListOption> {
        registry.get(self.current)
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    pub fn has_committed_once(&self) -> bool {
        self.has_committed_once
    }

    pub fn is_current(&self, id: OptionId) -> bool {
        self.current == id
    }

    pub(crate) fn mark_open(&mut self) {
        self.is_open = true;
    }

    pub(crate) fn mark_closed(&mut self) {
        self.is_open = false;
    }

    pub(crate) fn commit(&mut self, id: OptionId) {
        self.current = id;
        self.has_committed_once = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::OptionDecl;

    #[test]
    fn commit_replaces_current_and_latches_flag() {
        let registry =
            OptionRegistry::scan([OptionDecl::new("A"), OptionDecl::new("B")]).unwrap();
        let a = registry.first().id;
        let b = registry.last().id;

        let mut state = SelectionState::new(a, Some("Pick".to_string()));
        assert!(!state.has_committed_once());
        assert!(state.is_current(a));

        state.commit(b);
        assert!(state.is_current(b));
        assert!(!state.is_current(a));
        assert!(state.has_committed_once());
        assert_eq!(state.current_option(&registry).unwrap().label, "B");

        state.commit(a);
        assert!(state.has_committed_once());
    }

    #[test]
    fn open_flag_follows_marks() {
        let registry = OptionRegistry::scan([OptionDecl::new("A")]).unwrap();
        let mut state = SelectionState::new(registry.first().id, None);
        assert!(!state.is_open());
        state.mark_open();
        assert!(state.is_open());
        state.mark_closed();
        assert!(!state.is_open());
    }
}
