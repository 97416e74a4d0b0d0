//! Simulated page plus engine. Applies script steps the way a browser would:
//! mutate the document, then deliver the matching page events.

use crate::script::Step;
use clap::ValueEnum;
use core_actions::{Engine, Outcome};
use core_events::{CommandEvent, Event, FocusTarget, KeyToken, NamedKey, PageEvent, UiEvent};
use core_render::{measure, place, render_lines};
use core_surface::{Document, Editable, NodeId, host, resolve_root};
use core_text::Rect;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Kind of editable surface the simulated page hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FieldKind {
    /// `<input>`-like single line field.
    Single,
    /// `<textarea>`-like field.
    Multi,
    /// Flat contenteditable element.
    Rich,
    /// Contenteditable editor with one paragraph per line.
    Blocks,
}

pub struct Driver {
    pub doc: Document,
    pub engine: Engine,
    pub root: NodeId,
}

impl Driver {
    pub fn new(engine: Engine, kind: FieldKind, initial: &str) -> Self {
        let mut doc = Document::new();
        let body = doc.body();
        let rect = Rect::new(40.0, 80.0, 480.0, 120.0);
        let root = match kind {
            FieldKind::Single | FieldKind::Multi => {
                let f = doc.append_field(body, kind == FieldKind::Multi, rect);
                if let Some(field) = doc.field_mut(f) {
                    field.value.set(initial);
                }
                f
            }
            FieldKind::Rich => {
                let el = doc.append_element(body, "div", Editable::True, rect);
                if !initial.is_empty() {
                    doc.append_text(el, initial);
                }
                el
            }
            FieldKind::Blocks => {
                let el = doc.append_element(body, "div", Editable::True, rect);
                for line in initial.split('\n') {
                    let p = doc.append_element(el, "p", Editable::Inherit, Rect::default());
                    if !line.is_empty() {
                        doc.append_text(p, line);
                    }
                }
                el
            }
        };
        doc.focus(root);
        if let Some(surface) = resolve_root(&doc, root) {
            let end = surface.text(&doc).map_or(0, |t| t.chars().count());
            let _ = surface.set_cursor_offset(&mut doc, end);
        }
        debug!(target: "runtime", kind = ?kind, root = root.index(), "page_ready");
        Self { doc, engine, root }
    }

    pub fn text(&self) -> String {
        resolve_root(&self.doc, self.root)
            .and_then(|s| s.text(&self.doc))
            .unwrap_or_default()
    }

    /// Deliver one event, then feed the input notifications it caused back
    /// in as page events.
    pub fn handle(&mut self, event: Event, now: Instant) -> Outcome {
        let out = self.engine.handle(&mut self.doc, event, now);
        self.pump(now);
        out
    }

    pub fn pump(&mut self, now: Instant) {
        loop {
            let notes = self.doc.take_notifications();
            if notes.is_empty() {
                return;
            }
            for n in notes {
                trace!(target: "runtime.events", target_node = n.target.index(), synthetic = n.synthetic, "input_notification");
                self.engine
                    .handle(&mut self.doc, Event::Page(PageEvent::Input { target: n.target }), now);
            }
        }
    }

    /// Apply one script step. Returns the pause requested by `wait`.
    pub fn step(&mut self, step: &Step, now: Instant) -> Option<Duration> {
        trace!(target: "runtime", step = ?std::mem::discriminant(step), "script_step");
        match step {
            Step::Type(text) => self.type_text(text, now),
            Step::Backspace(n) => {
                for _ in 0..*n {
                    host::press_backspace(&mut self.doc);
                    self.pump(now);
                }
            }
            Step::Key(key) => {
                let target = self.doc.focused().unwrap_or(self.root);
                let out = self.handle(Event::Page(PageEvent::KeyDown { target, key: *key }), now);
                if !out.consumed {
                    self.default_key_action(key.key, key.mods.is_empty(), now);
                }
            }
            Step::Fill(value) => {
                self.handle(Event::Ui(UiEvent::FieldInput(value.clone())), now);
            }
            Step::Field(i) => {
                self.handle(Event::Ui(UiEvent::FieldFocus(*i)), now);
            }
            Step::Pick(i) => {
                self.handle(Event::Ui(UiEvent::PickItem(*i)), now);
            }
            Step::Hover(i) => {
                self.handle(Event::Ui(UiEvent::HoverItem(*i)), now);
            }
            Step::Caret(offset) => {
                host::move_caret(&mut self.doc, *offset);
                let target = self.root;
                self.handle(Event::Page(PageEvent::SelectionChange { target }), now);
            }
            Step::Blur => {
                self.doc.blur();
                let target = self.root;
                self.handle(
                    Event::Page(PageEvent::FocusOut {
                        target,
                        related: FocusTarget::Nowhere,
                    }),
                    now,
                );
            }
            Step::ClickOutside => {
                self.handle(
                    Event::Page(PageEvent::PointerDown {
                        target: FocusTarget::Nowhere,
                    }),
                    now,
                );
            }
            Step::Toggle => {
                self.handle(Event::Command(CommandEvent::Toggle), now);
            }
            Step::Layout => {
                self.handle(Event::Page(PageEvent::Layout), now);
            }
            Step::Detach => self.doc.detach(self.root),
            Step::Show => {
                for line in self.view_lines() {
                    println!("{line}");
                }
            }
            Step::Wait(d) => return Some(*d),
        }
        None
    }

    /// Dropdown as text, headed by its placement on the page.
    pub fn view_lines(&self) -> Vec<String> {
        let Some(view) = self.engine.view() else {
            return vec!["(no dropdown)".to_string()];
        };
        let mut lines = Vec::new();
        if let Some(anchor) = view.anchor() {
            let r = place(anchor, measure(&view), self.doc.viewport());
            lines.push(format!("@ {:.0},{:.0} {:.0}x{:.0}", r.x, r.y, r.width, r.height));
        }
        lines.extend(render_lines(&view));
        lines
    }

    fn type_text(&mut self, text: &str, now: Instant) {
        for c in text.chars() {
            let mut buf = [0u8; 4];
            host::type_text(&mut self.doc, c.encode_utf8(&mut buf));
            self.pump(now);
        }
    }

    /// What the page does with a key the engine left alone.
    fn default_key_action(&mut self, key: KeyToken, plain: bool, now: Instant) {
        match key {
            KeyToken::Named(NamedKey::Backspace) => {
                host::press_backspace(&mut self.doc);
                self.pump(now);
            }
            KeyToken::Named(NamedKey::Enter) => {
                let single = resolve_root(&self.doc, self.root).is_some_and(|s| s.is_single_line(&self.doc));
                if !single {
                    self.type_text("\n", now);
                }
            }
            KeyToken::Char(c) if plain => self.type_text(&c.to_string(), now),
            _ => {}
        }
    }
}
