use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::registry::OptionId;

use super::shared_state::{PageResources, SharedStateError};

/// Stable identity of a mounted listbox within a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything that can hold focus on the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FocusTarget {
    Toggle(InstanceId),
    Option(InstanceId, OptionId),
    /// An element outside every listbox, named by the host.
    External(String),
}

impl FocusTarget {
    pub fn external(name: impl Into<String>) -> Self {
        FocusTarget::External(name.into())
    }

    /// Whether the target lives inside the element subtree of `instance`.
    pub fn is_within(&self, instance: &InstanceId) -> bool {
        match self {
            FocusTarget::Toggle(owner) | FocusTarget::Option(owner, _) => owner == instance,
            FocusTarget::External(_) => false,
        }
    }

    pub fn option_id(&self) -> Option<OptionId> {
        match self {
            FocusTarget::Option(_, id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Default)]
struct CursorInner {
    focused: Option<FocusTarget>,
    detached: HashSet<FocusTarget>,
}

/// The page's single focus cursor, shared by every widget on it.
#[derive(Default)]
pub struct FocusCursor {
    inner: RwLock<CursorInner>,
}

impl FocusCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self, target: FocusTarget) {
        if let Ok(mut guard) = self.inner.write() {
            guard.detached.remove(&target);
            guard.focused = Some(target);
        }
    }

    pub fn blur(&self) {
        if let Ok(mut guard) = self.inner.write() {
            guard.focused = None;
        }
    }

    pub fn current(&self) -> Option<FocusTarget> {
        self.inner.read().ok().and_then(|guard| guard.focused.clone())
    }

    /// Remove an element from the document. Focus on it is lost.
    pub fn detach(&self, target: &FocusTarget) {
        if let Ok(mut guard) = self.inner.write() {
            if guard.focused.as_ref() == Some(target) {
                guard.focused = None;
            }
            guard.detached.insert(target.clone());
        }
    }

    pub fn is_attached(&self, target: &FocusTarget) -> bool {
        self.inner
            .read()
            .map(|guard| !guard.detached.contains(target))
            .unwrap_or(false)
    }
}

pub type SharedFocus = Arc<FocusCursor>;

pub fn ensure_focus_cursor(resources: &PageResources) -> Result<SharedFocus, SharedStateError> {
    resources.get_or_insert_with::<FocusCursor, _>(FocusCursor::new)
}

/// Focus holder captured when the list opens, consumed when it closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusMemento {
    target: Option<FocusTarget>,
}

impl FocusMemento {
    pub fn capture(cursor: &FocusCursor) -> Self {
        Self {
            target: cursor.current(),
        }
    }

    pub fn target(&self) -> Option<&FocusTarget> {
        self.target.as_ref()
    }

    /// Where focus goes on close: the remembered target while it is still in
    /// the document, the toggle otherwise. `Err` carries the stale target.
    pub fn restore_target(
        self,
        cursor: &FocusCursor,
        toggle: FocusTarget,
    ) -> Result<FocusTarget, (FocusTarget, FocusTarget)> {
        match self.target {
            Some(target) if cursor.is_attached(&target) => Ok(target),
            Some(stale) => Err((stale, toggle)),
            None => Ok(toggle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(name: &str) -> InstanceId {
        InstanceId::new(name)
    }

    #[test]
    fn focus_and_blur() {
        let cursor = FocusCursor::new();
        cursor.focus(FocusTarget::external("search"));
        assert_eq!(cursor.current(), Some(FocusTarget::external("search")));
        cursor.blur();
        assert!(cursor.current().is_none());
    }

    #[test]
    fn detach_drops_focus_and_marks_target() {
        let cursor = FocusCursor::new();
        let target = FocusTarget::external("button");
        cursor.focus(target.clone());
        cursor.detach(&target);
        assert!(cursor.current().is_none());
        assert!(!cursor.is_attached(&target));

        cursor.focus(target.clone());
        assert!(cursor.is_attached(&target));
    }

    #[test]
    fn subtree_membership_is_per_instance() {
        let a = instance("a");
        let b = instance("b");
        assert!(FocusTarget::Toggle(a.clone()).is_within(&a));
        assert!(!FocusTarget::Toggle(b).is_within(&a));
        assert!(!FocusTarget::external("body").is_within(&a));
    }

    #[test]
    fn memento_falls_back_to_toggle_when_stale() {
        let cursor = FocusCursor::new();
        let toggle = FocusTarget::Toggle(instance("a"));
        let outside = FocusTarget::external("link");

        cursor.focus(outside.clone());
        let memento = FocusMemento::capture(&cursor);
        assert_eq!(
            memento.clone().restore_target(&cursor, toggle.clone()),
            Ok(outside.clone())
        );

        cursor.detach(&outside);
        assert_eq!(
            memento.restore_target(&cursor, toggle.clone()),
            Err((outside, toggle))
        );
    }

    #[test]
    fn empty_memento_restores_toggle() {
        let cursor = FocusCursor::new();
        let toggle = FocusTarget::Toggle(instance("a"));
        let memento = FocusMemento::capture(&cursor);
        assert_eq!(memento.restore_target(&cursor, toggle.clone()), Ok(toggle));
    }
}
