use std::sync::{Arc, Mutex};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use serde_json::{Value, json};

use crate::config::ListboxConfig;
use crate::emitter::{EventEmitter, ListenerId, ListboxNotification, ensure_event_bus};
use crate::error::{Diagnostic, ListboxError, Result};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv, json_str};
use crate::metrics::ListboxMetrics;
use crate::registry::{ListOption, OptionDecl, OptionId, OptionRegistry};
use crate::render::{Projection, RenderSurface, Renderer, project};
use crate::state::SelectionState;

use super::active::{SharedSlot, ensure_active_slot};
use super::audit::{AuditEventBuilder, AuditStage, ListboxAudit, NullAudit};
use super::deferred::{Deferred, DispatchQueue};
use super::focus::{FocusMemento, FocusTarget, InstanceId, SharedFocus, ensure_focus_cursor};
use super::instances::{SharedNames, ensure_instance_names};
use super::shared_state::{PageResources, SharedStateError};

const LOG_TARGET: &str = "listbox::controller";

/// Observability collaborators handed to a controller at mount.
#[derive(Clone)]
pub struct ControllerHooks {
    pub logger: Option<Logger>,
    pub audit: Arc<dyn ListboxAudit>,
    pub metrics: Option<Arc<Mutex<ListboxMetrics>>>,
}

impl Default for ControllerHooks {
    fn default() -> Self {
        Self {
            logger: None,
            audit: Arc::new(NullAudit),
            metrics: None,
        }
    }
}

impl ControllerHooks {
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn ListboxAudit>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Mutex<ListboxMetrics>>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Arrow-key direction through the option list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Previous,
    Next,
}

/// Why an input produced no transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    AlreadyOpen,
    AlreadyClosed,
    NotOpen,
    /// The toggle already fired during this dispatch cycle.
    Debounced,
    /// Arrow navigation reached the first or last option.
    AtBoundary,
    /// Focus moved between elements of this listbox.
    FocusStayedInside,
    /// External open flag set to the value it already had.
    Redundant,
    KeyRelease,
    KeyRepeat,
    UnhandledKey,
    /// The focused element is not part of this listbox.
    ForeignTarget,
    NotEvicted,
    /// The input means nothing to the listbox.
    NoEffect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Opened,
    Closed,
    Committed { option: OptionId, value: String },
    Navigated { to: OptionId },
    Ignored(IgnoreReason),
}

impl Transition {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Transition::Ignored(_))
    }
}

/// Result of a key press: what happened, and whether the host must suppress
/// the key's default action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOutcome {
    pub transition: Transition,
    pub prevent_default: bool,
}

/// The listbox state machine. Owns the selection state and drives the
/// renderer, emitter and page focus from the operations below.
pub struct ListboxController {
    instance: InstanceId,
    registry: OptionRegistry,
    state: SelectionState,
    renderer: Renderer,
    surface: Box<dyn RenderSurface>,
    emitter: EventEmitter,
    focus: SharedFocus,
    slot: SharedSlot,
    names: SharedNames,
    memento: Option<FocusMemento>,
    deferred: DispatchQueue,
    diagnostics: Vec<Diagnostic>,
    hooks: ControllerHooks,
    toggled_this_cycle: bool,
    mounted: bool,
}

impl ListboxController {
    /// Register options, resolve the initial selection and draw the first
    /// projection. `Ready` is emitted when the first dispatch cycle ends.
    pub fn mount<I>(
        config: &ListboxConfig,
        decls: I,
        surface: Box<dyn RenderSurface>,
        page: &PageResources,
        hooks: ControllerHooks,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = OptionDecl>,
    {
        config.validate()?;
        let registry = OptionRegistry::scan(decls)?;

        let focus = ensure_focus_cursor(page).map_err(page_error)?;
        let slot = ensure_active_slot(page).map_err(page_error)?;
        let bus = ensure_event_bus(page).map_err(page_error)?;
        let names = ensure_instance_names(page).map_err(page_error)?;

        let instance = names.reserve(config.instance.as_deref()).ok_or_else(|| {
            ListboxError::InvalidConfig(format!(
                "instance `{}` is already mounted on this page",
                config.instance.as_deref().unwrap_or_default()
            ))
        })?;

        let resolution = registry.resolve_initial(config.requested_value());
        let current = resolution.option().id;
        let mut diagnostics = Vec::new();
        if resolution.is_fallback() {
            if let Some(requested) = config.requested_value() {
                diagnostics.push(Diagnostic::UnresolvedInitialValue {
                    requested: requested.to_string(),
                });
            }
        }

        let state = SelectionState::new(current, config.placeholder_text().map(str::to_string));
        let mut deferred = DispatchQueue::new();
        deferred.schedule(Deferred::Ready);

        let mut controller = Self {
            emitter: EventEmitter::new(instance.clone()).with_ancestors(bus),
            instance,
            registry,
            state,
            renderer: Renderer::new(),
            surface,
            focus,
            slot,
            names,
            memento: None,
            deferred,
            diagnostics,
            hooks,
            toggled_this_cycle: false,
            mounted: true,
        };

        for diagnostic in controller.diagnostics.clone() {
            controller.report(&diagnostic);
        }

        // Opening at mount happens before the first render, so focus stays put.
        if config.open {
            controller.memento = Some(FocusMemento::capture(&controller.focus));
            controller.state.mark_open();
            controller.claim_slot();
        }

        controller.rerender()?;
        controller.audit(
            AuditStage::Mounted,
            [
                json_kv("options", json!(controller.registry.len())),
                json_str("value", controller.value()),
                json_kv("open", json!(controller.state.is_open())),
            ],
        );
        controller.log(
            LogLevel::Info,
            "mounted",
            [
                json_kv("options", json!(controller.registry.len())),
                json_str("value", controller.value()),
            ],
        );
        Ok(controller)
    }

    pub fn instance(&self) -> &InstanceId {
        &self.instance
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn registry(&self) -> &OptionRegistry {
        &self.registry
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn current_option(&self) -> &ListOption {
        self.state
            .current_option(&self.registry)
            .unwrap_or_else(|| self.registry.first())
    }

    pub fn value(&self) -> &str {
        &self.current_option().value
    }

    /// Non-fatal conditions recovered since mount.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn toggle_target(&self) -> FocusTarget {
        FocusTarget::Toggle(self.instance.clone())
    }

    pub fn option_target(&self, id: OptionId) -> FocusTarget {
        FocusTarget::Option(self.instance.clone(), id)
    }

    /// Draw the current projection even if it matches the last one applied,
    /// for surfaces that were cleared behind the renderer's back.
    pub fn repaint(&mut self) -> Result<()> {
        self.ensure_mounted()?;
        self.renderer.invalidate();
        self.rerender()?;
        Ok(())
    }

    /// Pure projection of the current state, without touching the surface.
    pub fn projection(&self) -> Projection {
        project(&self.state, &self.registry, self.focused_option())
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&ListboxNotification) + Send + Sync + 'static,
    {
        self.emitter.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.emitter.unsubscribe(id)
    }

    /// Toggle activation (pointer press or Space on the toggle). Fires at most
    /// once per dispatch cycle.
    pub fn toggle(&mut self) -> Result<Transition> {
        self.ensure_mounted()?;
        if self.toggled_this_cycle {
            return Ok(self.ignore("toggle", IgnoreReason::Debounced));
        }
        self.toggled_this_cycle = true;
        if self.state.is_open() {
            self.close_list(true)
        } else {
            self.open_list()
        }
    }

    pub fn open(&mut self) -> Result<Transition> {
        self.ensure_mounted()?;
        if self.state.is_open() {
            return Ok(self.ignore("open", IgnoreReason::AlreadyOpen));
        }
        self.open_list()
    }

    pub fn close(&mut self) -> Result<Transition> {
        self.ensure_mounted()?;
        if !self.state.is_open() {
            return Ok(self.ignore("close", IgnoreReason::AlreadyClosed));
        }
        self.close_list(true)
    }

    /// Drive the state from the host's external open flag. Setting the value
    /// it already has is ignored.
    pub fn set_open(&mut self, open: bool) -> Result<Transition> {
        self.ensure_mounted()?;
        if open == self.state.is_open() {
            return Ok(self.ignore("set_open", IgnoreReason::Redundant));
        }
        if open {
            self.open_list()
        } else {
            self.close_list(true)
        }
    }

    /// Commit `id` as the current option. Re-selecting the current option is
    /// a full commit and notifies again.
    pub fn select(&mut self, id: OptionId) -> Result<Transition> {
        self.ensure_mounted()?;
        let option = self
            .registry
            .get(id)
            .cloned()
            .ok_or(ListboxError::UnknownOption(id))?;
        if !self.state.is_open() {
            return Ok(self.ignore("select", IgnoreReason::NotOpen));
        }

        let before = self.state.clone();
        self.state.commit(option.id);
        if let Err(err) = self.rerender() {
            self.state = before;
            return Err(err);
        }
        self.emitter.notify_change(&option.value);
        self.record_metric(ListboxMetrics::record_commit);
        self.audit(
            AuditStage::Committed,
            [
                json_str("label", option.label.as_str()),
                json_str("value", option.value.as_str()),
            ],
        );
        self.log(
            LogLevel::Info,
            "committed",
            [json_str("value", option.value.as_str())],
        );

        self.close_list(true)?;
        Ok(Transition::Committed {
            option: option.id,
            value: option.value,
        })
    }

    /// Move focus one option up or down. Never wraps.
    pub fn navigate(&mut self, direction: NavDirection) -> Result<Transition> {
        self.ensure_mounted()?;
        if !self.state.is_open() {
            return Ok(self.ignore("navigate", IgnoreReason::NotOpen));
        }

        let target = match self.focused_option() {
            Some(from) => match direction {
                NavDirection::Next => self.registry.next(from),
                NavDirection::Previous => self.registry.previous(from),
            },
            None => self.state.current_option(&self.registry),
        };
        let Some(to) = target.map(|option| option.id) else {
            return Ok(self.ignore("navigate", IgnoreReason::AtBoundary));
        };

        self.focus.focus(self.option_target(to));
        self.rerender()?;
        self.audit(AuditStage::Navigated, [json_kv("to", json!(to.get()))]);
        Ok(Transition::Navigated { to })
    }

    /// Key press delivered to whichever element of the page holds focus.
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<KeyOutcome> {
        self.ensure_mounted()?;
        let prevent_default = self.state.is_open() && consumes_while_open(key.code);

        if key.kind == KeyEventKind::Release {
            return Ok(KeyOutcome {
                transition: self.ignore("key", IgnoreReason::KeyRelease),
                prevent_default,
            });
        }

        let transition = match key.code {
            KeyCode::Char(' ') => self.activate_focused(key.kind)?,
            KeyCode::Esc | KeyCode::Tab | KeyCode::BackTab => {
                if self.state.is_open() {
                    self.close_list(true)?
                } else {
                    self.ignore("key", IgnoreReason::NotOpen)
                }
            }
            KeyCode::Up => self.navigate(NavDirection::Previous)?,
            KeyCode::Down => self.navigate(NavDirection::Next)?,
            _ => self.ignore("key", IgnoreReason::UnhandledKey),
        };

        Ok(KeyOutcome {
            transition,
            prevent_default,
        })
    }

    /// Focus left an element of this listbox for `related` (`None` when focus
    /// left the page). Closes only when focus left the subtree entirely, and
    /// then restores focus like any other close.
    pub fn focus_out(&mut self, related: Option<&FocusTarget>) -> Result<Transition> {
        self.ensure_mounted()?;
        if !self.state.is_open() {
            return Ok(self.ignore("focus_out", IgnoreReason::NotOpen));
        }
        if related.is_some_and(|target| target.is_within(&self.instance)) {
            return Ok(self.ignore("focus_out", IgnoreReason::FocusStayedInside));
        }
        self.close_list(true)
    }

    /// Close if another instance on the page claimed the active slot.
    pub fn reconcile_active(&mut self) -> Result<Transition> {
        self.ensure_mounted()?;
        if !self.slot.take_eviction(&self.instance) || !self.state.is_open() {
            return Ok(Transition::Ignored(IgnoreReason::NotEvicted));
        }
        self.close_list(false)
    }

    /// End of a dispatch cycle: run deferred work and re-arm the toggle.
    pub fn end_cycle(&mut self) -> Result<()> {
        self.ensure_mounted()?;
        self.toggled_this_cycle = false;
        for work in self.deferred.drain() {
            match work {
                Deferred::FocusOption(id) => {
                    if self.state.is_open() {
                        self.focus.focus(self.option_target(id));
                        self.rerender()?;
                    }
                }
                Deferred::Ready => {
                    self.emitter.notify_ready(&self.current_option().value);
                    self.log(LogLevel::Debug, "ready", std::iter::empty());
                }
            }
        }
        Ok(())
    }

    /// Release every listener, drop pending work and the focus memento, and
    /// refuse further operations. Calling it twice is harmless.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        let dropped = self.deferred.cancel_all();
        self.memento = None;
        self.slot.release(&self.instance);
        self.names.release(&self.instance);
        let value = self.current_option().value.clone();
        self.emitter.notify_destroy(&value);
        let listeners = self.emitter.listener_count();
        self.emitter.release_all();
        self.mounted = false;
        self.audit(
            AuditStage::Unmounted,
            [
                json_kv("deferred_dropped", json!(dropped)),
                json_kv("listeners_released", json!(listeners)),
            ],
        );
        self.log(LogLevel::Info, "unmounted", [json_str("value", value)]);
    }

    fn activate_focused(&mut self, kind: KeyEventKind) -> Result<Transition> {
        if kind == KeyEventKind::Repeat {
            return Ok(self.ignore("key", IgnoreReason::KeyRepeat));
        }
        match self.focus.current() {
            Some(FocusTarget::Toggle(owner)) if owner == self.instance => self.toggle(),
            Some(FocusTarget::Option(owner, id)) if owner == self.instance => self.select(id),
            _ => Ok(self.ignore("key", IgnoreReason::ForeignTarget)),
        }
    }

    fn open_list(&mut self) -> Result<Transition> {
        self.memento = Some(FocusMemento::capture(&self.focus));
        self.state.mark_open();
        self.claim_slot();
        self.deferred
            .schedule(Deferred::FocusOption(self.state.current()));
        self.rerender()?;
        self.record_metric(ListboxMetrics::record_open);
        self.audit(AuditStage::Opened, std::iter::empty());
        self.log(LogLevel::Debug, "opened", std::iter::empty());
        Ok(Transition::Opened)
    }

    fn close_list(&mut self, restore_focus: bool) -> Result<Transition> {
        self.state.mark_closed();
        self.slot.release(&self.instance);
        let memento = self.memento.take();
        if restore_focus {
            self.restore_focus(memento);
        }
        self.rerender()?;
        self.record_metric(ListboxMetrics::record_close);
        self.audit(
            AuditStage::Closed,
            [json_kv("focus_restored", json!(restore_focus))],
        );
        self.log(LogLevel::Debug, "closed", std::iter::empty());
        Ok(Transition::Closed)
    }

    fn restore_focus(&mut self, memento: Option<FocusMemento>) {
        let toggle = self.toggle_target();
        let target = match memento {
            Some(memento) => match memento.restore_target(&self.focus, toggle.clone()) {
                Ok(target) => target,
                Err((stale, fallback)) => {
                    let diagnostic = Diagnostic::DetachedFocusMemento { target: stale };
                    self.report(&diagnostic);
                    self.diagnostics.push(diagnostic);
                    fallback
                }
            },
            None => toggle,
        };
        self.focus.focus(target);
    }

    fn claim_slot(&mut self) {
        if let Some(evicted) = self.slot.claim(&self.instance) {
            self.log(
                LogLevel::Debug,
                "evicted_active_instance",
                [json_str("evicted", evicted.to_string())],
            );
        }
    }

    fn focused_option(&self) -> Option<OptionId> {
        self.focus
            .current()
            .filter(|target| target.is_within(&self.instance))
            .and_then(|target| target.option_id())
    }

    fn rerender(&mut self) -> Result<bool> {
        let projection = self.projection();
        let applied = self.renderer.render(self.surface.as_mut(), &projection)?;
        if let Some(metrics) = self.hooks.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_render(applied);
            }
        }
        Ok(applied)
    }

    fn ensure_mounted(&self) -> Result<()> {
        if self.mounted {
            Ok(())
        } else {
            Err(ListboxError::Unmounted)
        }
    }

    fn ignore(&self, input: &str, reason: IgnoreReason) -> Transition {
        self.audit(
            AuditStage::Ignored,
            [
                json_str("input", input),
                json_str("reason", format!("{:?}", reason)),
            ],
        );
        Transition::Ignored(reason)
    }

    fn report(&self, diagnostic: &Diagnostic) {
        let detail = match diagnostic {
            Diagnostic::UnresolvedInitialValue { requested } => json_str("requested", requested),
            Diagnostic::DetachedFocusMemento { target } => {
                json_str("target", format!("{:?}", target))
            }
        };
        self.log(
            LogLevel::Warn,
            "diagnostic",
            [json_str("code", diagnostic.code()), detail],
        );
    }

    fn record_metric(&self, record: fn(&mut ListboxMetrics)) {
        if let Some(metrics) = self.hooks.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                record(&mut *guard);
            }
        }
    }

    fn audit<I>(&self, stage: AuditStage, details: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let event = details
            .into_iter()
            .fold(
                AuditEventBuilder::new(stage).detail("instance", json!(self.instance.as_str())),
                |builder, (key, value)| builder.detail(key, value),
            )
            .finish();
        self.hooks.audit.record(event);
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if let Some(logger) = self.hooks.logger.as_ref() {
            let instance = json_str("instance", self.instance.as_str());
            let event = event_with_fields(
                level,
                LOG_TARGET,
                message,
                std::iter::once(instance).chain(fields),
            );
            let _ = logger.log_event(event);
        }
    }
}

impl Drop for ListboxController {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn consumes_while_open(code: KeyCode) -> bool {
    matches!(
        code,
        KeyCode::Char(' ')
            | KeyCode::Esc
            | KeyCode::Tab
            | KeyCode::BackTab
            | KeyCode::Up
            | KeyCode::Down
    )
}

fn page_error(err: SharedStateError) -> ListboxError {
    ListboxError::InvalidConfig(format!("page resources unavailable: {err}"))
}
