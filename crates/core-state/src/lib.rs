//! Dropdown session state: the single mutable record one trigger-to-insertion
//! interaction works on, plus the follow-up queue that carries its deferred
//! work.
//!
//! Invariants:
//! - An open session always satisfies `start_offset <= last_cursor_offset`;
//!   `update_cursor` refuses a cursor before the start instead of storing it.
//! - `selected_index` is `Some(i)` with `i < ranked.len()` whenever `ranked`
//!   is non-empty, and `None` otherwise.
//! - `placeholder` is `Some` only in `Mode::PlaceholderCollection`.

use core_config::Template;
use core_match::rank;
use core_surface::NodeId;
use core_template::PlaceholderSession;
use core_text::Rect;
use tracing::debug;

pub mod followup;

pub use followup::{FollowUp, FollowUpQueue, Generation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Filtering,
    PlaceholderCollection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Hotkey,
    TextTrigger,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropdownSession {
    pub trigger_kind: TriggerKind,
    /// Root of the surface the session is bound to.
    pub surface: NodeId,
    pub start_offset: usize,
    pub last_cursor_offset: usize,
    /// Char length of the text trigger that opened the session; zero for
    /// hotkey sessions.
    pub trigger_len: usize,
    pub filter_text: String,
    pub ranked: Vec<Template>,
    pub selected_index: Option<usize>,
    pub placeholder: Option<PlaceholderSession>,
    /// Last measured caret box, used to anchor the dropdown.
    pub anchor: Option<Rect>,
}

impl DropdownSession {
    pub fn open(
        trigger_kind: TriggerKind,
        surface: NodeId,
        start_offset: usize,
        cursor: usize,
        trigger_len: usize,
    ) -> Self {
        Self {
            trigger_kind,
            surface,
            start_offset,
            last_cursor_offset: cursor.max(start_offset),
            trigger_len,
            filter_text: String::new(),
            ranked: Vec::new(),
            selected_index: None,
            placeholder: None,
            anchor: None,
        }
    }

    pub fn mode(&self) -> Mode {
        if self.placeholder.is_some() {
            Mode::PlaceholderCollection
        } else {
            Mode::Filtering
        }
    }

    /// Start of the text the inserted template replaces. Text trigger
    /// sessions also remove the trigger token.
    pub fn replace_start(&self) -> usize {
        match self.trigger_kind {
            TriggerKind::Hotkey => self.start_offset,
            TriggerKind::TextTrigger => self.start_offset.saturating_sub(self.trigger_len),
        }
    }

    /// Record a new cursor position. Returns `false`, leaving the session
    /// unchanged, when the cursor moved before the start offset.
    pub fn update_cursor(&mut self, cursor: usize) -> bool {
        if cursor < self.start_offset {
            return false;
        }
        self.last_cursor_offset = cursor;
        true
    }

    /// Replace the query and re-rank `library`. The selection returns to the
    /// first row.
    pub fn refilter(&mut self, filter_text: impl Into<String>, library: &[Template]) {
        self.filter_text = filter_text.into();
        self.ranked = rank(&self.filter_text, library)
            .into_iter()
            .cloned()
            .collect();
        self.selected_index = (!self.ranked.is_empty()).then_some(0);
        debug!(
            target: "session",
            query_len = self.filter_text.chars().count(),
            ranked = self.ranked.len(),
            "session_refiltered"
        );
    }

    pub fn selected(&self) -> Option<&Template> {
        self.selected_index.and_then(|i| self.ranked.get(i))
    }

    /// Move the selection down, wrapping to the top.
    pub fn select_next(&mut self) {
        let n = self.ranked.len();
        if n == 0 {
            return;
        }
        self.selected_index = Some(self.selected_index.map_or(0, |i| (i + 1) % n));
    }

    /// Move the selection up, wrapping to the bottom.
    pub fn select_previous(&mut self) {
        let n = self.ranked.len();
        if n == 0 {
            return;
        }
        self.selected_index = Some(self.selected_index.map_or(n - 1, |i| (i + n - 1) % n));
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index < self.ranked.len() {
            self.selected_index = Some(index);
            true
        } else {
            false
        }
    }

    /// Enter placeholder collection for the selected template. Returns
    /// `false` when there is no selection or the template has no
    /// placeholders.
    pub fn begin_placeholders(&mut self) -> bool {
        let Some(template) = self.selected() else {
            return false;
        };
        match PlaceholderSession::new(&template.content) {
            Some(p) => {
                self.placeholder = Some(p);
                true
            }
            None => false,
        }
    }

    /// Leave placeholder collection and show the full library again with an
    /// empty query.
    pub fn back_to_filtering(&mut self, library: &[Template]) {
        self.placeholder = None;
        self.refilter("", library);
    }
}

/// Transient "no prompts yet" indicator shown instead of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmptyNotice {
    pub anchor: Option<Rect>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn library() -> Vec<Template> {
        vec![
            Template::new("1", "Greeting", "Hello [name]!"),
            Template::new("2", "Summary", "Summarize this"),
            Template::new("3", "Grammar", "Fix grammar"),
        ]
    }

    fn root() -> NodeId {
        core_surface::Document::new().body()
    }

    fn session() -> DropdownSession {
        DropdownSession::open(TriggerKind::TextTrigger, root(), 3, 6, 3)
    }

    #[test]
    fn open_and_refilter() {
        let lib = library();
        let mut s = session();
        assert_eq!(s.mode(), Mode::Filtering);
        s.refilter("Gr", &lib);
        let names: Vec<&str> = s.ranked.iter().map(|t| t.name.as_str()).collect();
        // "Grammar" also earns content bonuses.
        assert_eq!(names, vec!["Grammar", "Greeting"]);
        assert_eq!(s.selected_index, Some(0));
        s.refilter("zzz", &lib);
        assert_eq!(s.selected_index, None);
        assert_eq!(s.selected(), None);
    }

    #[test]
    fn replace_start_includes_trigger_for_text_sessions() {
        let s = session();
        assert_eq!(s.replace_start(), 0);
        let h = DropdownSession::open(TriggerKind::Hotkey, root(), 4, 6, 0);
        assert_eq!(h.replace_start(), 4);
    }

    #[test]
    fn cursor_before_start_is_refused() {
        let mut s = session();
        assert!(s.update_cursor(7));
        assert!(!s.update_cursor(2));
        assert_eq!(s.last_cursor_offset, 7);
    }

    #[test]
    fn navigation_wraps() {
        let lib = library();
        let mut s = session();
        s.refilter("", &lib);
        s.select_previous();
        assert_eq!(s.selected_index, Some(2));
        s.select_next();
        assert_eq!(s.selected_index, Some(0));
        assert!(!s.select(3));
        assert!(s.select(1));
        assert_eq!(s.selected().map(|t| t.id.as_str()), Some("2"));
    }

    #[test]
    fn placeholder_round_trip() {
        let lib = library();
        let mut s = session();
        s.refilter("sum", &lib);
        assert!(!s.begin_placeholders());
        s.refilter("greet", &lib);
        assert!(s.begin_placeholders());
        assert_eq!(s.mode(), Mode::PlaceholderCollection);
        s.back_to_filtering(&lib);
        assert_eq!(s.mode(), Mode::Filtering);
        assert_eq!(s.filter_text, "");
        assert_eq!(s.ranked, lib);
    }
}
