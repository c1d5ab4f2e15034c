//! Error orchestrator. Fatal errors live in [`ListboxError`]; recoverable
//! conditions are surfaced as [`Diagnostic`] records instead.

mod types;

pub use types::{Diagnostic, ListboxError, Result};
