use thiserror::Error;

use crate::logging::LoggingError;
use crate::registry::OptionId;
use crate::runtime::focus::FocusTarget;

/// Unified result type for the listbox crate.
pub type Result<T> = std::result::Result<T, ListboxError>;

/// Errors surfaced by the listbox core.
#[derive(Debug, Error)]
pub enum ListboxError {
    #[error("listbox declares no options")]
    EmptyRegistry,
    #[error("option `{0}` is not registered with this listbox")]
    UnknownOption(OptionId),
    #[error("listbox has been unmounted")]
    Unmounted,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("terminal backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Non-fatal conditions recovered locally by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The requested initial value matched no option; the first option was used.
    UnresolvedInitialValue { requested: String },
    /// The remembered focus target left the document; focus went to the toggle.
    DetachedFocusMemento { target: FocusTarget },
}

impl Diagnostic {
    pub fn code(&self) -> &'static str {
        match self {
            Diagnostic::UnresolvedInitialValue { .. } => "unresolved_initial_value",
            Diagnostic::DetachedFocusMemento { .. } => "detached_focus_memento",
        }
    }
}
