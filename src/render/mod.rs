//! Projection of selection state onto observable output.
//!
//! [`project`] is a pure function of state; [`Renderer`] applies its result
//! to a [`RenderSurface`] only when it differs from the last one applied.

mod ansi;
mod core;

pub use ansi::{AnsiSurface, HitTarget, ListboxLayout, SharedLayout};
pub use self::core::{MemorySurface, OptionView, Projection, RenderSurface, Renderer, project};
