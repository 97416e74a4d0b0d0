//! Placeholder tokens inside template bodies.
//!
//! Two token forms are recognised, `[name]` / `[name:default]` and
//! `{name}` / `{name:default}`. A name is recorded on its first occurrence;
//! later occurrences of the same name in the other form stay literal text
//! because substitution only replaces tokens equal to the recorded pattern.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

mod session;

pub use session::PlaceholderSession;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\[\]{}:]+)(?::([^\[\]{}]*))?\]|\{([^\[\]{}:]+)(?::([^\[\]{}]*))?\}")
        .expect("placeholder pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Bracket,
    Brace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    pub default_value: String,
    pub syntax: Syntax,
    /// Token text exactly as it first appeared, e.g. `[tone:friendly]`.
    pub pattern: String,
}

struct Token<'a> {
    start: usize,
    end: usize,
    text: &'a str,
    name: &'a str,
    default_value: &'a str,
    syntax: Syntax,
}

fn token_from<'h>(caps: &Captures<'h>) -> Option<Token<'h>> {
    let whole = caps.get(0)?;
    let (name, default_value, syntax) = match caps.get(1) {
        Some(n) => (n, caps.get(2), Syntax::Bracket),
        None => (caps.get(3)?, caps.get(4), Syntax::Brace),
    };
    let name = name.as_str().trim();
    if name.is_empty() {
        return None;
    }
    Some(Token {
        start: whole.start(),
        end: whole.end(),
        text: whole.as_str(),
        name,
        default_value: default_value.map(|m| m.as_str()).unwrap_or(""),
        syntax,
    })
}

fn tokens(content: &str) -> impl Iterator<Item = Token<'_>> {
    TOKEN.captures_iter(content).filter_map(|c| token_from(&c))
}

/// Placeholders in first-occurrence order, deduplicated by name.
pub fn extract(content: &str) -> Vec<Placeholder> {
    let mut out: Vec<Placeholder> = Vec::new();
    for tok in tokens(content) {
        if out.iter().any(|p| p.name == tok.name) {
            continue;
        }
        out.push(Placeholder {
            name: tok.name.to_string(),
            default_value: tok.default_value.to_string(),
            syntax: tok.syntax,
            pattern: tok.text.to_string(),
        });
    }
    out
}

/// Effective text for a placeholder: the entered value, else its default,
/// else the bracketed name.
pub fn resolve_value(p: &Placeholder, values: &HashMap<String, String>) -> String {
    match values.get(&p.name) {
        Some(v) if !v.is_empty() => v.clone(),
        _ if !p.default_value.is_empty() => p.default_value.clone(),
        _ => format!("[{}]", p.name),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Value {
        /// Index into the placeholder list.
        index: usize,
        text: String,
        highlighted: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Preview {
    pub segments: Vec<Segment>,
}

impl Preview {
    /// Flattened text without highlighting.
    pub fn plain(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(t) => t.as_str(),
                Segment::Value { text, .. } => text.as_str(),
            })
            .collect()
    }

    /// HTML-ish markup: the highlighted placeholder in `<mark>`, others in
    /// `<span class="ph">`.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for s in &self.segments {
            match s {
                Segment::Literal(t) => out.push_str(&escape(t)),
                Segment::Value {
                    text,
                    highlighted: true,
                    ..
                } => {
                    out.push_str("<mark>");
                    out.push_str(&escape(text));
                    out.push_str("</mark>");
                }
                Segment::Value { text, .. } => {
                    out.push_str("<span class=\"ph\">");
                    out.push_str(&escape(text));
                    out.push_str("</span>");
                }
            }
        }
        out
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

// Single left to right pass; substituted values are never rescanned.
fn segments(
    content: &str,
    placeholders: &[Placeholder],
    values: &HashMap<String, String>,
    highlight: Option<usize>,
) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut last = 0usize;
    for tok in tokens(content) {
        let Some(index) = placeholders.iter().position(|p| p.pattern == tok.text) else {
            continue;
        };
        if tok.start > last {
            out.push(Segment::Literal(content[last..tok.start].to_string()));
        }
        out.push(Segment::Value {
            index,
            text: resolve_value(&placeholders[index], values),
            highlighted: highlight == Some(index),
        });
        last = tok.end;
    }
    if last < content.len() {
        out.push(Segment::Literal(content[last..].to_string()));
    }
    out
}

pub fn render_preview(
    content: &str,
    placeholders: &[Placeholder],
    values: &HashMap<String, String>,
    highlight_index: usize,
) -> Preview {
    Preview {
        segments: segments(content, placeholders, values, Some(highlight_index)),
    }
}

/// Text actually inserted into the surface.
pub fn substitute_final(
    content: &str,
    placeholders: &[Placeholder],
    values: &HashMap<String, String>,
) -> String {
    Preview {
        segments: segments(content, placeholders, values, None),
    }
    .plain()
}
