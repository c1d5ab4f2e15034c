use std::io::Write;
use std::sync::{Arc, RwLock};

use crate::cursor;
use crate::error::Result;
use crate::geometry::Rect;
use crate::registry::OptionId;
use crate::width::fit_to_width;

use super::core::{Projection, RenderSurface};

const TOGGLE_CLOSED_ICON: &str = "▾";
const TOGGLE_OPEN_ICON: &str = "▴";

/// What a terminal cell belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Toggle,
    Option(OptionId),
}

/// Row assignment of the last applied projection, used for mouse hit tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListboxLayout {
    rect: Option<Rect>,
    visible_rows: Vec<OptionId>,
}

impl ListboxLayout {
    /// Map a 0-based terminal cell to the toggle or an option row.
    pub fn hit_test(&self, column: u16, row: u16) -> Option<HitTarget> {
        let rect = self.rect?;
        if !rect.contains(column, row) {
            return None;
        }
        if row == rect.y {
            return Some(HitTarget::Toggle);
        }
        let index = usize::from(row - rect.y - 1);
        self.visible_rows.get(index).copied().map(HitTarget::Option)
    }
}

pub type SharedLayout = Arc<RwLock<ListboxLayout>>;

/// Draws projections into a terminal rectangle: the toggle on the first row,
/// one row per option underneath while open.
pub struct AnsiSurface<W: Write + Send> {
    writer: W,
    rect: Rect,
    drawn_rows: u16,
    layout: SharedLayout,
}

impl<W: Write + Send> AnsiSurface<W> {
    pub fn new(writer: W, rect: Rect) -> Self {
        Self {
            writer,
            rect,
            drawn_rows: 0,
            layout: Arc::new(RwLock::new(ListboxLayout::default())),
        }
    }

    /// Handle onto the layout this surface keeps current.
    pub fn layout(&self) -> SharedLayout {
        Arc::clone(&self.layout)
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    fn write_row(&mut self, offset: u16, text: &str, highlight: bool) -> Result<()> {
        let line = fit_to_width(text, usize::from(self.rect.width));
        write!(
            self.writer,
            "{}",
            cursor::move_to(self.rect.y + offset + 1, self.rect.x + 1)
        )?;
        if highlight {
            write!(self.writer, "{}{}{}", cursor::reverse(), line, cursor::reset())?;
        } else {
            write!(self.writer, "{}", line)?;
        }
        Ok(())
    }
}

impl<W: Write + Send> RenderSurface for AnsiSurface<W> {
    fn apply(&mut self, projection: &Projection) -> Result<()> {
        if self.rect.width == 0 || self.rect.height == 0 {
            return Ok(());
        }

        let icon = if projection.expanded {
            TOGGLE_OPEN_ICON
        } else {
            TOGGLE_CLOSED_ICON
        };
        self.write_row(0, &format!("[{}] {}", icon, projection.toggle_text), false)?;

        let capacity = self.rect.height.saturating_sub(1);
        let mut visible_rows = Vec::new();
        if projection.visible {
            for view in projection.options.iter().take(usize::from(capacity)) {
                let marker = if view.selected { '*' } else { ' ' };
                let row = visible_rows.len() as u16 + 1;
                self.write_row(row, &format!(" {} {}", marker, view.label), view.focused)?;
                visible_rows.push(view.id);
            }
        }

        let rows_now = visible_rows.len() as u16;
        for row in rows_now..self.drawn_rows {
            self.write_row(row + 1, "", false)?;
        }
        self.drawn_rows = rows_now;
        self.writer.flush()?;

        if let Ok(mut guard) = self.layout.write() {
            guard.rect = Some(self.rect);
            guard.visible_rows = visible_rows;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{OptionDecl, OptionRegistry};
    use crate::render::core::project;
    use crate::state::SelectionState;

    fn fixture() -> (OptionRegistry, SelectionState) {
        let registry = OptionRegistry::scan([
            OptionDecl::new("Apple"),
            OptionDecl::new("Banana"),
            OptionDecl::new("Cherry"),
        ])
        .unwrap();
        let state = SelectionState::new(registry.first().id, None);
        (registry, state)
    }

    #[test]
    fn closed_list_draws_only_the_toggle() {
        let (registry, state) = fixture();
        let mut surface = AnsiSurface::new(Vec::new(), Rect::new(2, 3, 12, 4));
        surface.apply(&project(&state, &registry, None)).unwrap();

        let rendered = String::from_utf8(surface.writer().clone()).unwrap();
        assert!(rendered.contains("\u{1b}[4;3H[▾] Apple   "));
        assert!(!rendered.contains("Banana"));
    }

    #[test]
    fn open_list_marks_selected_and_records_layout() {
        let (registry, mut state) = fixture();
        state.mark_open();
        let mut surface = AnsiSurface::new(Vec::new(), Rect::new(0, 0, 12, 3));
        surface.apply(&project(&state, &registry, None)).unwrap();

        let rendered = String::from_utf8(surface.writer().clone()).unwrap();
        assert!(rendered.contains(" * Apple"));
        assert!(rendered.contains("   Banana"));
        assert!(!rendered.contains("Cherry"));

        let layout = surface.layout();
        let layout = layout.read().unwrap();
        let banana = registry.next(registry.first().id).unwrap().id;
        assert_eq!(layout.hit_test(4, 0), Some(HitTarget::Toggle));
        assert_eq!(layout.hit_test(4, 2), Some(HitTarget::Option(banana)));
        assert_eq!(layout.hit_test(20, 2), None);
    }

    #[test]
    fn closing_clears_previously_drawn_rows() {
        let (registry, mut state) = fixture();
        let mut surface = AnsiSurface::new(Vec::new(), Rect::new(0, 0, 10, 4));
        state.mark_open();
        surface.apply(&project(&state, &registry, None)).unwrap();
        state.mark_closed();
        let before = surface.writer().len();
        surface.apply(&project(&state, &registry, None)).unwrap();

        let tail = String::from_utf8(surface.writer()[before..].to_vec()).unwrap();
        assert!(tail.contains(&format!("\u{1b}[4;1H{}", " ".repeat(10))));
        assert_eq!(surface.layout().read().unwrap().hit_test(1, 1), None);
    }
}
