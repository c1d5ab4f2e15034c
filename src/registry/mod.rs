//! Option registry orchestrator.
//!
//! Hosts declare options as [`OptionDecl`] values; [`OptionRegistry::scan`]
//! turns them into an ordered, immutable list with stable identities.

mod core;

pub use self::core::{InitialResolution, ListOption, OptionDecl, OptionId, OptionRegistry};
