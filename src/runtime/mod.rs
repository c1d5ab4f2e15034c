//! Host adapter around the listbox state machine.
//!
//! [`ListboxRuntime`] receives host events, maps them onto controller
//! operations, and closes every dispatch cycle so deferred work runs before
//! the next event. Scripted and live (crossterm) loops share that path.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton,
    MouseEvent, MouseEventKind,
};
use serde_json::json;

use crate::config::ListboxConfig;
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::metrics::ListboxMetrics;
use crate::registry::OptionDecl;
use crate::render::{HitTarget, RenderSurface, SharedLayout};
use crate::error::{ListboxError, Result};

pub mod active;
pub mod audit;
pub mod controller;
pub mod deferred;
pub mod driver;
pub mod focus;
pub mod instances;
pub mod shared_state;

use audit::ListboxAudit;
use controller::{ControllerHooks, IgnoreReason, KeyOutcome, ListboxController, Transition};
use focus::{FocusTarget, SharedFocus, ensure_focus_cursor};
use shared_state::PageResources;

const LOG_TARGET: &str = "listbox::runtime";

/// Name given to whatever the pointer lands on outside the listbox.
pub const OUTSIDE_TARGET: &str = "outside";

/// Configuration knobs for the host adapter.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Poll interval of the live loop.
    pub tick_interval: Duration,
    /// Optional structured logger shared with the controller.
    pub logger: Option<Logger>,
    /// Counters shared with the controller.
    pub metrics: Option<Arc<Mutex<ListboxMetrics>>>,
    /// Interval between metrics snapshot emissions. Zero disables snapshots.
    pub metrics_interval: Duration,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(200),
            logger: None,
            metrics: None,
            metrics_interval: Duration::from_secs(5),
            metrics_target: "listbox::runtime.metrics".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(ListboxMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<ListboxMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }

    fn controller_hooks(&self, audit: Option<Arc<dyn ListboxAudit>>) -> ControllerHooks {
        let mut hooks = ControllerHooks::default();
        if let Some(logger) = self.logger.clone() {
            hooks = hooks.with_logger(logger);
        }
        if let Some(metrics) = self.metrics_handle() {
            hooks = hooks.with_metrics(metrics);
        }
        if let Some(audit) = audit {
            hooks = hooks.with_audit(audit);
        }
        hooks
    }
}

/// Inbound events from the host tree.
#[derive(Debug, Clone)]
pub enum HostEvent {
    PointerDown(HitTarget),
    PointerUp(HitTarget),
    /// Raw terminal mouse event, resolved through the surface layout.
    Mouse(MouseEvent),
    /// Key press delivered to the focused element.
    Key(KeyEvent),
    /// Page focus moved to `Some(target)`, or left the page.
    FocusChanged(Option<FocusTarget>),
    /// The host toggled the external open flag.
    OpenFlag(bool),
    Tick,
}

/// Whether the host should run its default action for the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFlow {
    Continue,
    Consumed,
}

pub struct ListboxRuntime {
    controller: ListboxController,
    focus: SharedFocus,
    layout: Option<SharedLayout>,
    config: RuntimeConfig,
    bootstrapped: bool,
    redraw_requested: bool,
    should_exit: bool,
    start_instant: Option<Instant>,
    last_metrics_emit: Option<Instant>,
}

impl ListboxRuntime {
    /// Mount a listbox on `page`, wiring the runtime's logger and metrics
    /// into its controller.
    pub fn mount<I>(
        config: RuntimeConfig,
        listbox: &ListboxConfig,
        decls: I,
        surface: Box<dyn RenderSurface>,
        page: &PageResources,
        audit: Option<Arc<dyn ListboxAudit>>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = OptionDecl>,
    {
        let hooks = config.controller_hooks(audit);
        let controller = ListboxController::mount(listbox, decls, surface, page, hooks)?;
        Self::new(controller, page, config)
    }

    pub fn new(
        controller: ListboxController,
        page: &PageResources,
        config: RuntimeConfig,
    ) -> Result<Self> {
        let focus = ensure_focus_cursor(page).map_err(|err| {
            ListboxError::InvalidConfig(format!("page resources unavailable: {err}"))
        })?;
        Ok(Self {
            controller,
            focus,
            layout: None,
            config,
            bootstrapped: false,
            redraw_requested: true,
            should_exit: false,
            start_instant: None,
            last_metrics_emit: None,
        })
    }

    /// Resolve raw mouse events against this layout.
    pub fn with_layout(mut self, layout: SharedLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn controller(&self) -> &ListboxController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ListboxController {
        &mut self.controller
    }

    pub fn config_mut(&mut self) -> &mut RuntimeConfig {
        &mut self.config
    }

    /// Repaint the whole listbox on the next cycle, e.g. after the host
    /// cleared the screen.
    pub fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }

    /// Finish the mount cycle so `Ready` goes out, paint the first frame and
    /// hand the toggle focus when nothing on the page holds it. Later calls
    /// do nothing.
    pub fn bootstrap(&mut self) -> Result<()> {
        if self.bootstrapped {
            return Ok(());
        }
        self.bootstrapped = true;
        self.should_exit = false;
        let now = Instant::now();
        self.start_instant = Some(now);
        self.last_metrics_emit = Some(now);
        self.controller.end_cycle()?;
        if self.focus.current().is_none() {
            self.focus.focus(self.controller.toggle_target());
        }
        self.render_if_needed()?;
        self.log_runtime_event(
            LogLevel::Info,
            "runtime_started",
            [
                json_kv("instance", json!(self.controller.instance().as_str())),
                json_kv("options", json!(self.controller.registry().len())),
            ],
        );
        Ok(())
    }

    /// One full dispatch cycle: reconcile with other instances, apply the
    /// event, then run deferred work.
    pub fn dispatch(&mut self, event: HostEvent) -> Result<EventFlow> {
        self.bootstrap()?;
        self.controller.reconcile_active()?;

        let label = Self::describe_event(&event);
        let is_key = matches!(event, HostEvent::Key(_));
        let (flow, transition) = self.apply(event)?;
        self.controller.end_cycle()?;
        self.render_if_needed()?;

        self.record_metric(ListboxMetrics::record_event);
        if is_key && flow == EventFlow::Consumed {
            self.record_metric(ListboxMetrics::record_key_consumed);
        }
        self.log_runtime_event(
            LogLevel::Debug,
            "event_dispatched",
            [
                json_kv("event", json!(label)),
                json_kv("consumed", json!(flow == EventFlow::Consumed)),
                json_kv("transition", json!(format!("{:?}", transition))),
            ],
        );
        self.maybe_emit_metrics();
        Ok(flow)
    }

    pub fn run_scripted<I>(&mut self, events: I) -> Result<Vec<EventFlow>>
    where
        I: IntoIterator<Item = HostEvent>,
    {
        self.bootstrap()?;
        let mut flows = Vec::new();
        for event in events {
            flows.push(self.dispatch(event)?);
            if self.should_exit {
                break;
            }
        }
        self.finalize();
        Ok(flows)
    }

    /// Live loop over terminal input. Ctrl-C ends it. The caller owns raw
    /// mode and mouse capture.
    pub fn run(&mut self) -> Result<()> {
        self.bootstrap()?;
        let mut last_tick = Instant::now();

        while !self.should_exit {
            let timeout = self
                .config
                .tick_interval
                .checked_sub(last_tick.elapsed())
                .unwrap_or(Duration::ZERO);

            if event::poll(timeout)? {
                if let Some(host_event) = self.map_event(event::read()?) {
                    self.dispatch(host_event)?;
                }
            }

            if last_tick.elapsed() >= self.config.tick_interval {
                last_tick = Instant::now();
                self.dispatch(HostEvent::Tick)?;
            }
        }

        self.finalize();
        Ok(())
    }

    pub fn request_exit(&mut self) {
        self.should_exit = true;
    }

    /// Unmount the listbox; its listeners are released immediately.
    pub fn unmount(mut self) {
        self.controller.unmount();
        self.log_runtime_event(LogLevel::Info, "runtime_unmounted", std::iter::empty());
    }

    fn apply(&mut self, event: HostEvent) -> Result<(EventFlow, Transition)> {
        match event {
            HostEvent::PointerDown(HitTarget::Toggle) => {
                self.move_focus(Some(self.controller.toggle_target()))?;
                let transition = self.controller.toggle()?;
                Ok((EventFlow::Consumed, transition))
            }
            HostEvent::PointerUp(HitTarget::Option(id)) => {
                let transition = self.controller.select(id)?;
                Ok((EventFlow::Consumed, transition))
            }
            HostEvent::PointerDown(HitTarget::Option(id)) => {
                let target = self.controller.option_target(id);
                let transition = self.move_focus(Some(target))?;
                Ok((EventFlow::Continue, transition))
            }
            HostEvent::PointerUp(HitTarget::Toggle) => Ok((EventFlow::Continue, idle())),
            HostEvent::Mouse(mouse) => self.apply_mouse(mouse),
            HostEvent::Key(key) => {
                let KeyOutcome {
                    transition,
                    prevent_default,
                } = self.controller.handle_key(key)?;
                let flow = if prevent_default {
                    EventFlow::Consumed
                } else {
                    EventFlow::Continue
                };
                Ok((flow, transition))
            }
            HostEvent::FocusChanged(target) => {
                let transition = self.move_focus(target)?;
                Ok((EventFlow::Continue, transition))
            }
            HostEvent::OpenFlag(open) => {
                let transition = self.controller.set_open(open)?;
                Ok((EventFlow::Continue, transition))
            }
            HostEvent::Tick => Ok((EventFlow::Continue, idle())),
        }
    }

    fn apply_mouse(&mut self, mouse: MouseEvent) -> Result<(EventFlow, Transition)> {
        let hit = self
            .layout
            .as_ref()
            .and_then(|layout| layout.read().ok())
            .and_then(|layout| layout.hit_test(mouse.column, mouse.row));

        match (mouse.kind, hit) {
            (MouseEventKind::Down(MouseButton::Left), Some(target)) => {
                self.apply(HostEvent::PointerDown(target))
            }
            (MouseEventKind::Up(MouseButton::Left), Some(target)) => {
                self.apply(HostEvent::PointerUp(target))
            }
            (MouseEventKind::Down(_), None) => {
                let transition = self.move_focus(Some(FocusTarget::external(OUTSIDE_TARGET)))?;
                Ok((EventFlow::Continue, transition))
            }
            _ => Ok((EventFlow::Continue, idle())),
        }
    }

    /// Move page focus, reporting a focus-out to the controller when the
    /// previous holder was inside this listbox.
    fn move_focus(&mut self, target: Option<FocusTarget>) -> Result<Transition> {
        let previous = self.focus.current();
        match target.clone() {
            Some(next) => self.focus.focus(next),
            None => self.focus.blur(),
        }

        let was_inside = previous
            .as_ref()
            .is_some_and(|prev| prev.is_within(self.controller.instance()));
        if was_inside && previous != target {
            self.controller.focus_out(target.as_ref())
        } else {
            Ok(idle())
        }
    }

    fn map_event(&mut self, event: CrosstermEvent) -> Option<HostEvent> {
        match event {
            CrosstermEvent::Key(KeyEvent {
                code: KeyCode::Char('c'),
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) if modifiers.contains(KeyModifiers::CONTROL) => {
                self.request_exit();
                None
            }
            CrosstermEvent::Key(key) => Some(HostEvent::Key(key)),
            CrosstermEvent::Mouse(mouse) => Some(HostEvent::Mouse(mouse)),
            CrosstermEvent::FocusLost => Some(HostEvent::FocusChanged(None)),
            CrosstermEvent::Resize(..) => {
                self.request_redraw();
                Some(HostEvent::Tick)
            }
            CrosstermEvent::FocusGained | CrosstermEvent::Paste(_) => None,
        }
    }

    fn render_if_needed(&mut self) -> Result<()> {
        if !self.redraw_requested {
            return Ok(());
        }
        self.redraw_requested = false;
        self.controller.repaint()?;
        self.log_runtime_event(LogLevel::Debug, "repainted", std::iter::empty());
        Ok(())
    }

    fn finalize(&mut self) {
        let uptime_ms = self
            .start_instant
            .map(|start| start.elapsed().as_millis())
            .unwrap_or(0);
        self.log_runtime_event(
            LogLevel::Info,
            "runtime_stopped",
            [json_kv("uptime_ms", json!(uptime_ms))],
        );
    }

    fn record_metric(&self, record: fn(&mut ListboxMetrics)) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                record(&mut *guard);
            }
        }
    }

    fn maybe_emit_metrics(&mut self) {
        if self.config.metrics.is_none() || self.config.metrics_interval.is_zero() {
            return;
        }

        let now = Instant::now();
        match self.last_metrics_emit {
            Some(last) if now.duration_since(last) < self.config.metrics_interval => return,
            _ => self.last_metrics_emit = Some(now),
        }

        let uptime = self
            .start_instant
            .map(|start| now.duration_since(start))
            .unwrap_or_default();

        if let (Some(logger), Some(metrics)) =
            (self.config.logger.as_ref(), self.config.metrics.as_ref())
        {
            if let Ok(guard) = metrics.lock() {
                let event = guard
                    .snapshot(uptime)
                    .to_log_event(&self.config.metrics_target);
                let _ = logger.log_event(event);
            }
        }
    }

    fn log_runtime_event<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            let event = event_with_fields(level, LOG_TARGET, message, fields);
            let _ = logger.log_event(event);
        }
    }

    fn describe_event(event: &HostEvent) -> &'static str {
        match event {
            HostEvent::PointerDown(_) => "pointer_down",
            HostEvent::PointerUp(_) => "pointer_up",
            HostEvent::Mouse(_) => "mouse",
            HostEvent::Key(_) => "key",
            HostEvent::FocusChanged(_) => "focus_changed",
            HostEvent::OpenFlag(_) => "open_flag",
            HostEvent::Tick => "tick",
        }
    }
}

fn idle() -> Transition {
    Transition::Ignored(IgnoreReason::NoEffect)
}
