use std::sync::{Arc, Mutex};

use blake3::Hash;
use serde::Serialize;

use crate::error::Result;
use crate::registry::{OptionId, OptionRegistry};
use crate::state::SelectionState;

/// One option row as observed from outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub id: OptionId,
    pub label: String,
    pub selected: bool,
    pub focused: bool,
}

/// Everything a host shows for one listbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projection {
    pub toggle_text: String,
    /// `aria-expanded` on the toggle.
    pub expanded: bool,
    /// Whether the option list is visible.
    pub visible: bool,
    pub options: Vec<OptionView>,
}

impl Projection {
    pub fn selected(&self) -> impl Iterator<Item = &OptionView> {
        self.options.iter().filter(|view| view.selected)
    }

    pub fn selected_count(&self) -> usize {
        self.selected().count()
    }

    fn digest(&self) -> Result<Hash> {
        let bytes = serde_json::to_vec(self)?;
        Ok(blake3::hash(&bytes))
    }
}

/// Project state onto observable output. `focused` is the option holding
/// page focus, if it belongs to this listbox.
pub fn project(
    state: &SelectionState,
    registry: &OptionRegistry,
    focused: Option<OptionId>,
) -> Projection {
    let toggle_text = match state.placeholder() {
        Some(placeholder) if !state.has_committed_once() => placeholder.to_string(),
        _ => state
            .current_option(registry)
            .map(|option| option.label.clone())
            .unwrap_or_default(),
    };

    let options = registry
        .iter()
        .map(|option| OptionView {
            id: option.id,
            label: option.label.clone(),
            selected: state.is_current(option.id),
            focused: focused == Some(option.id),
        })
        .collect();

    Projection {
        toggle_text,
        expanded: state.is_open(),
        visible: state.is_open(),
        options,
    }
}

/// Output target for projections.
pub trait RenderSurface: Send {
    fn apply(&mut self, projection: &Projection) -> Result<()>;
}

/// Skips projections identical to the last one applied, so re-rendering
/// unchanged state never touches the surface.
#[derive(Debug, Default)]
pub struct Renderer {
    last: Option<Hash>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the surface was written.
    pub fn render(
        &mut self,
        surface: &mut dyn RenderSurface,
        projection: &Projection,
    ) -> Result<bool> {
        let digest = projection.digest()?;
        if self.last == Some(digest) {
            return Ok(false);
        }
        surface.apply(projection)?;
        self.last = Some(digest);
        Ok(true)
    }

    /// Forget the last projection so the next render always applies.
    pub fn invalidate(&mut self) {
        self.last = None;
    }
}

/// Records applied projections. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    applied: Arc<Mutex<Vec<Projection>>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<Projection> {
        self.applied
            .lock()
            .ok()
            .and_then(|guard| guard.last().cloned())
    }

    pub fn apply_count(&self) -> usize {
        self.applied.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

impl RenderSurface for MemorySurface {
    fn apply(&mut self, projection: &Projection) -> Result<()> {
        if let Ok(mut guard) = self.applied.lock() {
            guard.push(projection.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::OptionDecl;

    fn fixture(placeholder: Option<&str>) -> (OptionRegistry, SelectionState) {
        let registry = OptionRegistry::scan([
            OptionDecl::with_value("A", "a"),
            OptionDecl::with_value("B", "b"),
        ])
        .unwrap();
        let state = SelectionState::new(registry.first().id, placeholder.map(str::to_string));
        (registry, state)
    }

    #[test]
    fn placeholder_shows_until_first_commit() {
        let (registry, mut state) = fixture(Some("Choose one"));
        assert_eq!(project(&state, &registry, None).toggle_text, "Choose one");

        let b = registry.last().id;
        state.commit(b);
        assert_eq!(project(&state, &registry, None).toggle_text, "B");
    }

    #[test]
    fn exactly_current_is_selected() {
        let (registry, mut state) = fixture(None);
        let projection = project(&state, &registry, None);
        assert_eq!(projection.toggle_text, "A");
        assert_eq!(projection.selected_count(), 1);

        state.commit(registry.last().id);
        let projection = project(&state, &registry, None);
        assert_eq!(projection.selected_count(), 1);
        assert_eq!(projection.selected().next().unwrap().label, "B");
    }

    #[test]
    fn open_flag_drives_visibility_and_expanded() {
        let (registry, mut state) = fixture(None);
        state.mark_open();
        let projection = project(&state, &registry, Some(registry.first().id));
        assert!(projection.visible);
        assert!(projection.expanded);
        assert!(projection.options[0].focused);
        assert!(!projection.options[1].focused);
    }

    #[test]
    fn renderer_is_idempotent() {
        let (registry, mut state) = fixture(None);
        let surface = MemorySurface::new();
        let mut target = surface.clone();
        let mut renderer = Renderer::new();

        let projection = project(&state, &registry, None);
        assert!(renderer.render(&mut target, &projection).unwrap());
        assert!(!renderer.render(&mut target, &projection).unwrap());
        assert_eq!(surface.apply_count(), 1);

        state.mark_open();
        let projection = project(&state, &registry, None);
        assert!(renderer.render(&mut target, &projection).unwrap());
        assert_eq!(surface.apply_count(), 2);

        renderer.invalidate();
        assert!(renderer.render(&mut target, &projection).unwrap());
        assert_eq!(surface.apply_count(), 3);
    }
}
