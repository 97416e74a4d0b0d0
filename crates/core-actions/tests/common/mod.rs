#![allow(dead_code)] // Shared across integration tests; each test binary uses a subset of helpers.

use core_actions::{Engine, Outcome};
use core_config::{Settings, Template};
use core_events::{Event, KeyEvent, NamedKey, PageEvent, UiEvent};
use core_keymap::Platform;
use core_surface::{Document, Editable, NodeId, host, resolve_root};
use core_text::Rect;
use std::time::{Duration, Instant};

pub fn library() -> Vec<Template> {
    vec![
        Template::new("g", "Greeting", "Hello [name]!"),
        Template::new("s", "Summary", "Summarize the text above."),
        Template::new("t", "Translate", "Translate to {lang:French}."),
    ]
}

/// A page with one editable surface, an engine, and a manual clock.
pub struct Page {
    pub doc: Document,
    pub engine: Engine,
    pub root: NodeId,
    pub now: Instant,
}

impl Page {
    fn new(doc: Document, root: NodeId, settings: Settings) -> Self {
        Self {
            doc,
            engine: Engine::new(settings, Platform::Other),
            root,
            now: Instant::now(),
        }
    }

    pub fn field(prompts: Vec<Template>) -> Self {
        Self::field_with(Settings::default().with_prompts(prompts), false)
    }

    pub fn field_with(settings: Settings, multiline: bool) -> Self {
        let mut doc = Document::new();
        let root = doc.append_field(doc.body(), multiline, Rect::new(20.0, 40.0, 320.0, 24.0));
        doc.focus(root);
        Self::new(doc, root, settings)
    }

    /// Block structured editor holding one paragraph per entry of `blocks`,
    /// caret at the end of the last one.
    pub fn blocks(prompts: Vec<Template>, blocks: &[&str]) -> Self {
        let mut doc = Document::new();
        let root = doc.append_element(
            doc.body(),
            "div",
            Editable::True,
            Rect::new(0.0, 120.0, 480.0, 160.0),
        );
        for text in blocks {
            let p = doc.append_element(root, "p", Editable::Inherit, Rect::default());
            if !text.is_empty() {
                doc.append_text(p, text);
            }
        }
        doc.focus(root);
        let mut page = Self::new(doc, root, Settings::default().with_prompts(prompts));
        let end = page.text().chars().count();
        if let Some(surface) = resolve_root(&page.doc, root) {
            let _ = surface.set_cursor_offset(&mut page.doc, end);
        }
        page
    }

    pub fn send(&mut self, event: Event) -> Outcome {
        let out = self.engine.handle(&mut self.doc, event, self.now);
        self.pump();
        out
    }

    /// Feed pending input notifications back to the engine as page events.
    pub fn pump(&mut self) {
        loop {
            let notes = self.doc.take_notifications();
            if notes.is_empty() {
                return;
            }
            for n in notes {
                self.engine.handle(
                    &mut self.doc,
                    Event::Page(PageEvent::Input { target: n.target }),
                    self.now,
                );
            }
        }
    }

    pub fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            let mut buf = [0u8; 4];
            host::type_text(&mut self.doc, c.encode_utf8(&mut buf));
            self.pump();
        }
    }

    pub fn move_caret(&mut self, offset: usize) {
        host::move_caret(&mut self.doc, offset);
        let target = self.root;
        self.send(Event::Page(PageEvent::SelectionChange { target }));
    }

    pub fn press(&mut self, key: NamedKey) -> Outcome {
        let target = self.root;
        self.send(Event::Page(PageEvent::KeyDown {
            target,
            key: KeyEvent::named(key),
        }))
    }

    pub fn fill(&mut self, value: &str) -> Outcome {
        self.send(Event::Ui(UiEvent::FieldInput(value.to_string())))
    }

    pub fn advance(&mut self, ms: u64) -> Outcome {
        self.now += Duration::from_millis(ms);
        let out = self.engine.tick(&mut self.doc, self.now);
        self.pump();
        out
    }

    pub fn text(&self) -> String {
        resolve_root(&self.doc, self.root)
            .and_then(|s| s.text(&self.doc))
            .unwrap_or_default()
    }

    pub fn cursor(&self) -> Option<usize> {
        resolve_root(&self.doc, self.root).and_then(|s| s.cursor_offset(&self.doc))
    }
}
