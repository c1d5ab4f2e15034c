//! Single-selection listbox widget core.
//!
//! The crate models a dropdown as a plain state machine: an option registry,
//! the selection state, an interaction controller that reacts to pointer,
//! keyboard and focus input, an idempotent renderer and a bubbling event
//! emitter. Hosts plug in through [`ListboxRuntime`] and a [`RenderSurface`].

pub mod config;
pub mod cursor;
pub mod emitter;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod render;
pub mod runtime;
pub mod state;
pub mod width;

pub use config::ListboxConfig;
pub use emitter::{
    EventBus, EventEmitter, ListboxNotification, ListenerId, NotificationKind, ensure_event_bus,
};
pub use error::{Diagnostic, ListboxError, Result};
pub use geometry::Rect;
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink,
};
pub use metrics::{ListboxMetrics, MetricSnapshot};
pub use registry::{InitialResolution, ListOption, OptionDecl, OptionId, OptionRegistry};
pub use render::{
    AnsiSurface, HitTarget, ListboxLayout, MemorySurface, OptionView, Projection, RenderSurface,
    Renderer, project,
};
pub use runtime::active::{ActiveInstanceSlot, ensure_active_slot};
pub use runtime::audit::{
    AuditEvent, AuditEventBuilder, AuditStage, BufferedAudit, ListboxAudit, NullAudit,
};
pub use runtime::controller::{
    ControllerHooks, IgnoreReason, KeyOutcome, ListboxController, NavDirection, Transition,
};
pub use runtime::deferred::{Deferred, DispatchQueue};
pub use runtime::driver::CliDriver;
pub use runtime::focus::{
    FocusCursor, FocusMemento, FocusTarget, InstanceId, SharedFocus, ensure_focus_cursor,
};
pub use runtime::instances::{InstanceNames, ensure_instance_names};
pub use runtime::shared_state::{PageResources, SharedStateError};
pub use runtime::{EventFlow, HostEvent, ListboxRuntime, OUTSIDE_TARGET, RuntimeConfig};
pub use state::SelectionState;
pub use width::{display_width, fit_to_width};
