//! Dropdown view model.
//!
//! `build_view` turns the live session (or the empty-library notice) into a
//! `DropdownView`: a list window, a placeholder form with its preview, or the
//! empty state. `place` anchors the box to the caret and `render_lines`
//! produces a plain-text rendering used by the headless driver and tests.
//!
//! The list shows at most `max_visible` rows. The window is derived from the
//! selection alone so the same session always renders the same rows:
//! selections inside the first page keep the window at the top, later
//! selections pin the selected row to the bottom edge.

use core_state::{DropdownSession, EmptyNotice, Mode};
use core_template::{Preview, Segment};
use core_text::{Rect, collapse_newlines};

mod placement;

pub use placement::{DROPDOWN_GAP, ROW_HEIGHT, measure, place};

pub const SNIPPET_CHARS: usize = 48;
pub const EMPTY_LIBRARY_MESSAGE: &str = "No prompts yet. Add some to promptdrop.toml.";
pub const NO_MATCHES_MESSAGE: &str = "No matching prompts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Index into the ranked list.
    pub index: usize,
    pub name: String,
    pub snippet: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
    pub default_value: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropdownView {
    List {
        anchor: Option<Rect>,
        query: String,
        rows: Vec<Row>,
        /// Ranked rows hidden above / below the window.
        hidden_above: usize,
        hidden_below: usize,
    },
    Form {
        anchor: Option<Rect>,
        template_name: String,
        fields: Vec<FormField>,
        preview: Preview,
    },
    Empty {
        anchor: Option<Rect>,
    },
}

impl DropdownView {
    pub fn anchor(&self) -> Option<Rect> {
        match self {
            DropdownView::List { anchor, .. }
            | DropdownView::Form { anchor, .. }
            | DropdownView::Empty { anchor } => *anchor,
        }
    }
}

/// First visible row for a window of `height` rows.
pub fn window_start(selected: Option<usize>, total: usize, height: usize) -> usize {
    if height == 0 || total <= height {
        return 0;
    }
    match selected {
        Some(s) if s >= height => (s + 1 - height).min(total - height),
        _ => 0,
    }
}

fn snippet(content: &str) -> String {
    let flat = collapse_newlines(content.trim());
    let mut out: String = flat.chars().take(SNIPPET_CHARS).collect();
    if flat.chars().count() > SNIPPET_CHARS {
        out.push_str("...");
    }
    out
}

pub fn build_view(session: &DropdownSession, anchor: Option<Rect>, max_visible: usize) -> DropdownView {
    match (session.mode(), &session.placeholder) {
        (Mode::PlaceholderCollection, Some(ph)) => {
            let fields = ph
                .placeholders()
                .iter()
                .enumerate()
                .map(|(i, p)| FormField {
                    name: p.name.clone(),
                    value: ph.value(&p.name).to_string(),
                    default_value: p.default_value.clone(),
                    active: i == ph.current_index(),
                })
                .collect();
            DropdownView::Form {
                anchor,
                template_name: session
                    .selected()
                    .map(|t| t.name.clone())
                    .unwrap_or_default(),
                fields,
                preview: ph.preview(),
            }
        }
        _ => {
            let total = session.ranked.len();
            let height = max_visible.max(1);
            let first = window_start(session.selected_index, total, height);
            let rows: Vec<Row> = session
                .ranked
                .iter()
                .enumerate()
                .skip(first)
                .take(height)
                .map(|(i, t)| Row {
                    index: i,
                    name: t.name.clone(),
                    snippet: snippet(&t.content),
                    selected: session.selected_index == Some(i),
                })
                .collect();
            let shown = rows.len();
            DropdownView::List {
                anchor,
                query: session.filter_text.clone(),
                rows,
                hidden_above: first,
                hidden_below: total - first - shown,
            }
        }
    }
}

pub fn build_empty_view(notice: &EmptyNotice) -> DropdownView {
    DropdownView::Empty {
        anchor: notice.anchor,
    }
}

fn marked_preview(preview: &Preview) -> String {
    preview
        .segments
        .iter()
        .map(|s| match s {
            Segment::Literal(t) => t.clone(),
            Segment::Value {
                text,
                highlighted: true,
                ..
            } => format!("*{text}*"),
            Segment::Value { text, .. } => text.clone(),
        })
        .collect()
}

/// Plain-text rendering, one entry per screen row.
pub fn render_lines(view: &DropdownView) -> Vec<String> {
    let mut out = Vec::new();
    match view {
        DropdownView::List {
            query,
            rows,
            hidden_above,
            hidden_below,
            ..
        } => {
            if !query.is_empty() {
                out.push(format!("? {query}"));
            }
            if rows.is_empty() {
                out.push(format!("  {NO_MATCHES_MESSAGE}"));
            }
            if *hidden_above > 0 {
                out.push(format!("  ({hidden_above} more above)"));
            }
            for row in rows {
                let marker = if row.selected { '>' } else { ' ' };
                if row.snippet.is_empty() {
                    out.push(format!("{marker} {}", row.name));
                } else {
                    out.push(format!("{marker} {} - {}", row.name, row.snippet));
                }
            }
            if *hidden_below > 0 {
                out.push(format!("  ({hidden_below} more below)"));
            }
        }
        DropdownView::Form {
            template_name,
            fields,
            preview,
            ..
        } => {
            out.push(format!("# {template_name}"));
            for f in fields {
                let marker = if f.active { '>' } else { ' ' };
                if f.value.is_empty() && !f.default_value.is_empty() {
                    out.push(format!("{marker} {}: ({})", f.name, f.default_value));
                } else {
                    out.push(format!("{marker} {}: {}", f.name, f.value));
                }
            }
            out.push("--".to_string());
            out.extend(marked_preview(preview).lines().map(str::to_string));
        }
        DropdownView::Empty { .. } => out.push(EMPTY_LIBRARY_MESSAGE.to_string()),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::Template;
    use core_state::TriggerKind;
    use core_surface::Document;
    use pretty_assertions::assert_eq;

    fn session(n: usize) -> DropdownSession {
        let lib: Vec<Template> = (0..n)
            .map(|i| Template::new(i.to_string(), format!("P{i}"), format!("body {i}")))
            .collect();
        let mut s = DropdownSession::open(TriggerKind::Hotkey, Document::new().body(), 0, 0, 0);
        s.refilter("", &lib);
        s
    }

    #[test]
    fn window_follows_selection() {
        assert_eq!(window_start(Some(0), 20, 8), 0);
        assert_eq!(window_start(Some(7), 20, 8), 0);
        assert_eq!(window_start(Some(8), 20, 8), 1);
        assert_eq!(window_start(Some(19), 20, 8), 12);
        assert_eq!(window_start(Some(5), 3, 8), 0);
        assert_eq!(window_start(None, 20, 8), 0);
    }

    #[test]
    fn list_view_shows_window() {
        let mut s = session(5);
        s.select(4);
        let view = build_view(&s, None, 3);
        let lines = render_lines(&view);
        assert_eq!(
            lines,
            vec![
                "  (2 more above)".to_string(),
                "  P2 - body 2".to_string(),
                "  P3 - body 3".to_string(),
                "> P4 - body 4".to_string(),
            ]
        );
    }

    #[test]
    fn no_matches_row() {
        let mut s = session(2);
        s.refilter("zzz", &[]);
        let lines = render_lines(&build_view(&s, None, 8));
        assert_eq!(lines, vec!["? zzz".to_string(), format!("  {NO_MATCHES_MESSAGE}")]);
    }

    #[test]
    fn form_view_lists_fields_and_preview() {
        let lib = vec![Template::new("g", "Greeting", "Hello [name], {tone:kind}!")];
        let mut s = DropdownSession::open(TriggerKind::Hotkey, Document::new().body(), 0, 0, 0);
        s.refilter("", &lib);
        assert!(s.begin_placeholders());
        if let Some(ph) = s.placeholder.as_mut() {
            ph.set_current_value("Ann");
        }
        let view = build_view(&s, None, 8);
        assert_eq!(
            render_lines(&view),
            vec![
                "# Greeting".to_string(),
                "> name: Ann".to_string(),
                "  tone: kind".to_string(),
                "--".to_string(),
                "Hello *Ann*, kind!".to_string(),
            ]
        );
    }

    #[test]
    fn snippet_is_flattened_and_truncated() {
        let long = "line one\nline two ".repeat(10);
        let s = snippet(&long);
        assert!(!s.contains('\n'));
        assert!(s.ends_with("..."));
        assert_eq!(s.chars().count(), SNIPPET_CHARS + 3);
    }
}
