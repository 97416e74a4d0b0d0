//! Session engine.
//!
//! Sub-modules:
//! * `keys`   - list navigation and placeholder form keys
//! * `insert` - the insertion protocol
//!
//! Transitions are keyed on the current mode, the event kind and whether the
//! event came from the engine's own dropdown. The engine owns at most one
//! `DropdownSession` together with the surface strategy it is bound to; going
//! back to Idle drops both and bumps the follow-up generation so deferred work
//! scheduled for the old session never runs.

use crate::{EngineError, check_text_trigger};
use core_config::Settings;
use core_events::{CommandEvent, Event, FocusTarget, KeyEvent, PageEvent, UiEvent};
use core_keymap::{HotkeySpec, Platform};
use core_render::{DropdownView, build_empty_view, build_view};
use core_state::{
    DropdownSession, EmptyNotice, FollowUp, FollowUpQueue, Generation, Mode, TriggerKind,
};
use core_surface::{Document, EditableSurface, NodeId, resolve_root};
use core_text::{char_len, slice_chars, word_start_before};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

mod insert;
mod keys;

/// What the host should do with the event it just delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome {
    /// Suppress the event's default action (e.g. Enter inserting a newline).
    pub consumed: bool,
    /// The dropdown view changed and should be redrawn.
    pub redraw: bool,
}

impl Outcome {
    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn redraw() -> Self {
        Self {
            consumed: false,
            redraw: true,
        }
    }

    pub fn consumed() -> Self {
        Self {
            consumed: true,
            redraw: true,
        }
    }
}

/// A text trigger occurrence the user dismissed with Escape. It stays inert
/// until the text up to and including it changes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Dismissed {
    root: NodeId,
    occurrence: usize,
    prefix: String,
}

#[derive(Debug)]
pub struct Engine {
    settings: Settings,
    platform: Platform,
    hotkey: Option<HotkeySpec>,
    session: Option<DropdownSession>,
    surface: Option<Box<dyn EditableSurface>>,
    empty_notice: Option<EmptyNotice>,
    followups: FollowUpQueue,
    /// Input from `guard.0` is not treated as a trigger until `guard.1`.
    guard: Option<(NodeId, Instant)>,
    dismissed: Option<Dismissed>,
}

impl Engine {
    pub fn new(settings: Settings, platform: Platform) -> Self {
        let hotkey = parse_hotkey(&settings.hotkey, platform);
        Self {
            settings,
            platform,
            hotkey,
            session: None,
            surface: None,
            empty_notice: None,
            followups: FollowUpQueue::new(),
            guard: None,
            dismissed: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn hotkey(&self) -> Option<&HotkeySpec> {
        self.hotkey.as_ref()
    }

    pub fn mode(&self) -> Mode {
        self.session.as_ref().map_or(Mode::Idle, DropdownSession::mode)
    }

    pub fn session(&self) -> Option<&DropdownSession> {
        self.session.as_ref()
    }

    pub fn empty_notice(&self) -> Option<&EmptyNotice> {
        self.empty_notice.as_ref()
    }

    pub fn generation(&self) -> Generation {
        self.followups.generation()
    }

    pub fn pending_followups(&self) -> usize {
        self.followups.len()
    }

    /// Current dropdown view, if anything is shown.
    pub fn view(&self) -> Option<DropdownView> {
        if let Some(s) = &self.session {
            return Some(build_view(
                s,
                s.anchor,
                self.settings.engine.max_visible_items,
            ));
        }
        self.empty_notice.as_ref().map(build_empty_view)
    }

    pub fn handle(&mut self, doc: &mut Document, event: Event, now: Instant) -> Outcome {
        let result = match event {
            Event::Page(page) => {
                trace!(target: "session", kind = page.kind(), mode = ?self.mode(), "page_event");
                self.on_page(doc, page, now)
            }
            Event::Ui(ui) => self.on_ui(doc, ui, now),
            Event::Command(CommandEvent::Toggle) => self.on_toggle(doc, now),
            Event::Command(CommandEvent::Quit) | Event::Shutdown => {
                self.close("shutdown");
                Ok(Outcome::redraw())
            }
            Event::SettingsChanged(settings) => {
                self.apply_settings(settings);
                Ok(Outcome::redraw())
            }
            Event::Tick => Ok(self.tick(doc, now)),
        };
        result.unwrap_or_else(|e| self.recover(e))
    }

    /// Run follow-ups that are due. Also notices a surface that vanished
    /// while the session was open.
    pub fn tick(&mut self, doc: &mut Document, now: Instant) -> Outcome {
        let mut out = Outcome::ignored();
        if self.session.is_some() && !self.surface_live(doc) {
            return self.recover(EngineError::SurfaceUnavailable);
        }
        for task in self.followups.drain_due(now) {
            debug!(target: "session.followup", task = ?task, "followup_run");
            match task {
                FollowUp::RemeasureCaret => {
                    let rect = self.surface.as_ref().and_then(|s| s.caret_rect(doc));
                    if let Some(s) = self.session.as_mut() {
                        s.anchor = rect.or(s.anchor);
                        out.redraw = true;
                    }
                }
                FollowUp::RestoreFocus => {
                    if let Some(surface) = &self.surface {
                        surface.focus(doc);
                    }
                }
                FollowUp::CloseEmptyState => {
                    self.empty_notice = None;
                    out.redraw = true;
                }
            }
        }
        out
    }

    pub fn apply_settings(&mut self, settings: Settings) {
        self.hotkey = parse_hotkey(&settings.hotkey, self.platform);
        self.settings = settings;
        info!(
            target: "config",
            prompts = self.settings.prompts.len(),
            hotkey_enabled = self.hotkey.is_some(),
            text_trigger_enabled = !self.settings.text_trigger.is_empty(),
            "settings_applied"
        );
        if let Some(s) = self.session.as_mut()
            && s.mode() == Mode::Filtering
        {
            let query = s.filter_text.clone();
            s.refilter(query, &self.settings.prompts);
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Event routing
    // ---------------------------------------------------------------------------------------------

    fn on_page(&mut self, doc: &mut Document, event: PageEvent, now: Instant) -> Result<Outcome, EngineError> {
        match event {
            PageEvent::KeyDown { target, key } => self.on_key(doc, Some(target), key, now),
            PageEvent::Input { target } => {
                if self.session.is_some() {
                    if self.on_session_surface(doc, target) {
                        return self.on_surface_changed(doc);
                    }
                    return Ok(Outcome::ignored());
                }
                self.check_text_activation(doc, target, now)
            }
            PageEvent::SelectionChange { target } => {
                if self.session.is_some() && self.on_session_surface(doc, target) {
                    return self.on_surface_changed(doc);
                }
                Ok(Outcome::ignored())
            }
            PageEvent::FocusOut { target, related } => {
                if related == FocusTarget::OwnUi || !self.on_session_surface(doc, target) {
                    return Ok(Outcome::ignored());
                }
                if self.mode() == Mode::Filtering {
                    self.close("focus_lost");
                    return Ok(Outcome::redraw());
                }
                Ok(Outcome::ignored())
            }
            PageEvent::PointerDown { target } => match target {
                FocusTarget::OwnUi => Ok(Outcome::ignored()),
                FocusTarget::Page(node) if self.on_session_surface(doc, node) => Ok(Outcome::ignored()),
                _ if self.session.is_some() => {
                    self.close("pointer_outside");
                    Ok(Outcome::redraw())
                }
                _ => Ok(Outcome::ignored()),
            },
            PageEvent::Layout => {
                if self.session.is_some() {
                    self.followups.schedule(
                        FollowUp::RemeasureCaret,
                        self.settings.engine.remeasure_delay(),
                        now,
                    );
                }
                Ok(Outcome::ignored())
            }
        }
    }

    fn on_ui(&mut self, doc: &mut Document, event: UiEvent, now: Instant) -> Result<Outcome, EngineError> {
        match event {
            UiEvent::KeyDown(key) => self.on_key(doc, None, key, now),
            UiEvent::HoverItem(i) => {
                let changed = self
                    .session
                    .as_mut()
                    .filter(|s| s.mode() == Mode::Filtering)
                    .is_some_and(|s| s.select(i));
                Ok(if changed { Outcome::redraw() } else { Outcome::ignored() })
            }
            UiEvent::PickItem(i) => {
                let Some(s) = self.session.as_mut().filter(|s| s.mode() == Mode::Filtering) else {
                    return Ok(Outcome::ignored());
                };
                if !s.select(i) {
                    return Ok(Outcome::ignored());
                }
                self.choose_selected(doc, now)
            }
            UiEvent::FieldInput(value) => {
                let Some(ph) = self.session.as_mut().and_then(|s| s.placeholder.as_mut()) else {
                    return Ok(Outcome::ignored());
                };
                ph.set_current_value(value);
                Ok(Outcome::redraw())
            }
            UiEvent::FieldFocus(i) => {
                let Some(ph) = self.session.as_mut().and_then(|s| s.placeholder.as_mut()) else {
                    return Ok(Outcome::ignored());
                };
                ph.focus(i);
                Ok(Outcome::redraw())
            }
        }
    }

    fn on_key(
        &mut self,
        doc: &mut Document,
        target: Option<NodeId>,
        key: KeyEvent,
        now: Instant,
    ) -> Result<Outcome, EngineError> {
        if self.hotkey.is_some_and(|h| h.matches(&key)) {
            trace!(target: "trigger", "hotkey_matched");
            if self.session.is_some() {
                self.close("hotkey_toggle");
                return Ok(Outcome::consumed());
            }
            let Some(node) = target.or_else(|| focus_node(doc)) else {
                return Ok(Outcome::ignored());
            };
            return self.activate_hotkey(doc, node, now);
        }
        if let Some(t) = target
            && !self.on_session_surface(doc, t)
        {
            return Ok(Outcome::ignored());
        }
        match self.mode() {
            Mode::Idle => Ok(Outcome::ignored()),
            Mode::Filtering => self.list_key(doc, key, now),
            Mode::PlaceholderCollection => self.form_key(doc, key, now),
        }
    }

    fn on_toggle(&mut self, doc: &mut Document, now: Instant) -> Result<Outcome, EngineError> {
        if self.session.is_some() {
            self.close("external_toggle");
            return Ok(Outcome::redraw());
        }
        match focus_node(doc) {
            Some(node) => self.activate_hotkey(doc, node, now),
            None => {
                debug!(target: "trigger", "toggle_without_focus");
                Ok(Outcome::ignored())
            }
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Activation
    // ---------------------------------------------------------------------------------------------

    fn activate_hotkey(&mut self, doc: &mut Document, node: NodeId, now: Instant) -> Result<Outcome, EngineError> {
        let Some(surface) = resolve_root(doc, node) else {
            debug!(target: "trigger", node = node.index(), "no_editable_surface");
            return Ok(Outcome::ignored());
        };
        let text = surface.text(doc).ok_or(EngineError::SurfaceUnavailable)?;
        let cursor = surface.cursor_offset(doc).ok_or(EngineError::SurfaceUnavailable)?;
        let start = word_start_before(&text, cursor);
        // The hotkey belongs to the engine even when nothing can open.
        if let Err(e) = self.open(doc, surface, TriggerKind::Hotkey, start, cursor, 0, now) {
            let out = self.recover(e);
            return Ok(Outcome { consumed: true, ..out });
        }
        Ok(Outcome::consumed())
    }

    fn check_text_activation(&mut self, doc: &mut Document, target: NodeId, now: Instant) -> Result<Outcome, EngineError> {
        let trigger = self.settings.text_trigger.clone();
        if trigger.is_empty() {
            return Ok(Outcome::ignored());
        }
        let Some(surface) = resolve_root(doc, target) else {
            return Ok(Outcome::ignored());
        };
        let root = surface.root();
        if let Some((guarded, until)) = self.guard {
            if now >= until {
                self.guard = None;
            } else if guarded == root {
                trace!(target: "trigger", root = root.index(), "input_guarded");
                return Ok(Outcome::ignored());
            }
        }
        let (Some(text), Some(cursor)) = (surface.text(doc), surface.cursor_offset(doc)) else {
            return Ok(Outcome::ignored());
        };
        let Some(occurrence) = check_text_trigger(&text, cursor, &trigger) else {
            if self.dismissed.as_ref().is_some_and(|d| d.root == root) {
                self.dismissed = None;
            }
            return Ok(Outcome::ignored());
        };
        let trigger_len = char_len(&trigger);
        let start = occurrence + trigger_len;
        let prefix = slice_chars(&text, 0, start);
        if self
            .dismissed
            .as_ref()
            .is_some_and(|d| d.root == root && d.occurrence == occurrence && d.prefix == prefix)
        {
            trace!(target: "trigger", occurrence, "trigger_dismissed");
            return Ok(Outcome::ignored());
        }
        debug!(target: "trigger", occurrence, cursor, "text_trigger_matched");
        self.open(doc, surface, TriggerKind::TextTrigger, start, cursor, trigger_len, now)?;
        Ok(Outcome::redraw())
    }

    #[allow(clippy::too_many_arguments)]
    fn open(
        &mut self,
        doc: &mut Document,
        surface: Box<dyn EditableSurface>,
        kind: TriggerKind,
        start: usize,
        cursor: usize,
        trigger_len: usize,
        now: Instant,
    ) -> Result<(), EngineError> {
        if self.settings.prompts.is_empty() {
            // A notice already on screen keeps its original deadline.
            if self.empty_notice.is_some() {
                return Err(EngineError::EmptyLibrary);
            }
            self.followups.invalidate();
            self.empty_notice = Some(EmptyNotice {
                anchor: surface.caret_rect(doc),
            });
            self.followups.schedule(
                FollowUp::CloseEmptyState,
                self.settings.engine.empty_state(),
                now,
            );
            return Err(EngineError::EmptyLibrary);
        }
        let text = surface.text(doc).ok_or(EngineError::SurfaceUnavailable)?;
        let mut session = DropdownSession::open(kind, surface.root(), start, cursor, trigger_len);
        session.refilter(slice_chars(&text, start, cursor), &self.settings.prompts);
        session.anchor = surface.caret_rect(doc);
        self.followups.invalidate();
        self.followups.schedule(
            FollowUp::RemeasureCaret,
            self.settings.engine.remeasure_delay(),
            now,
        );
        info!(
            target: "session",
            kind = ?kind,
            surface = %surface.kind(),
            start,
            cursor,
            ranked = session.ranked.len(),
            "session_opened"
        );
        self.empty_notice = None;
        self.dismissed = None;
        self.session = Some(session);
        self.surface = Some(surface);
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------
    // Filtering
    // ---------------------------------------------------------------------------------------------

    fn on_surface_changed(&mut self, doc: &mut Document) -> Result<Outcome, EngineError> {
        if self.mode() != Mode::Filtering {
            return Ok(Outcome::ignored());
        }
        let (Some(session), Some(surface)) = (self.session.as_mut(), self.surface.as_ref()) else {
            return Ok(Outcome::ignored());
        };
        let (Some(text), Some(cursor)) = (surface.text(doc), surface.cursor_offset(doc)) else {
            return Err(EngineError::SurfaceUnavailable);
        };
        if !session.update_cursor(cursor) {
            self.close("cursor_before_start");
            return Ok(Outcome::redraw());
        }
        if session.start_offset > char_len(&text) {
            self.close("start_out_of_range");
            return Ok(Outcome::redraw());
        }
        if session.trigger_kind == TriggerKind::TextTrigger {
            let before = slice_chars(&text, session.replace_start(), session.start_offset);
            if before != self.settings.text_trigger {
                self.close("trigger_removed");
                return Ok(Outcome::redraw());
            }
        }
        let query = slice_chars(&text, session.start_offset, cursor);
        if query == session.filter_text {
            return Ok(Outcome::ignored());
        }
        session.refilter(query, &self.settings.prompts);
        Ok(Outcome::redraw())
    }

    // ---------------------------------------------------------------------------------------------
    // Teardown
    // ---------------------------------------------------------------------------------------------

    /// Return to Idle, invalidating every follow-up of the old session.
    fn close(&mut self, reason: &'static str) {
        if self.session.take().is_none() {
            return;
        }
        self.surface = None;
        let generation = self.followups.invalidate();
        debug!(target: "session", reason, generation = generation.get(), "session_closed");
    }

    /// Escape in the list: close and keep this trigger occurrence from
    /// reopening right away.
    fn dismiss(&mut self, doc: &Document) {
        if let (Some(s), Some(surface)) = (&self.session, &self.surface)
            && s.trigger_kind == TriggerKind::TextTrigger
            && let Some(text) = surface.text(doc)
        {
            self.dismissed = Some(Dismissed {
                root: s.surface,
                occurrence: s.replace_start(),
                prefix: slice_chars(&text, 0, s.start_offset).to_string(),
            });
        }
        self.close("escape");
    }

    fn recover(&mut self, err: EngineError) -> Outcome {
        match &err {
            EngineError::EmptyLibrary => {
                info!(target: "session", "empty_library");
            }
            EngineError::InvalidTrigger(e) => {
                warn!(target: "trigger", error = %e, "invalid_trigger");
            }
            EngineError::SurfaceUnavailable | EngineError::SelectionUnsupported => {
                warn!(target: "session", error = %err, "session_aborted");
                self.close("error");
            }
        }
        Outcome::redraw()
    }

    fn surface_live(&self, doc: &Document) -> bool {
        self.surface.as_ref().is_some_and(|s| s.is_live(doc))
    }

    fn on_session_surface(&self, doc: &Document, node: NodeId) -> bool {
        self.surface.as_ref().is_some_and(|s| {
            doc.contains(s.root(), node)
                || resolve_root(doc, node).is_some_and(|r| r.root() == s.root())
        })
    }
}

fn parse_hotkey(spec: &str, platform: Platform) -> Option<HotkeySpec> {
    match HotkeySpec::parse(spec, platform) {
        Ok(h) => Some(h),
        Err(e) => {
            let err = EngineError::from(e);
            warn!(target: "keymap", error = %err, "hotkey_disabled");
            None
        }
    }
}

fn focus_node(doc: &Document) -> Option<NodeId> {
    doc.focused().or_else(|| doc.caret().map(|c| c.node))
}
