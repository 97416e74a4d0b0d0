use crate::{Placeholder, Preview, extract, render_preview, substitute_final};
use std::collections::HashMap;
use tracing::debug;

/// Value collection for one selected template. Only exists while the
/// template has at least one placeholder, so `current_index` is always a
/// valid index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSession {
    source_content: String,
    placeholders: Vec<Placeholder>,
    values: HashMap<String, String>,
    current_index: usize,
}

impl PlaceholderSession {
    /// `None` when `content` has no placeholders. Values start at defaults.
    pub fn new(content: &str) -> Option<Self> {
        let placeholders = extract(content);
        if placeholders.is_empty() {
            return None;
        }
        let values = placeholders
            .iter()
            .map(|p| (p.name.clone(), p.default_value.clone()))
            .collect();
        debug!(target: "session", placeholders = placeholders.len(), "placeholder_session_created");
        Some(Self {
            source_content: content.to_string(),
            placeholders,
            values,
            current_index: 0,
        })
    }

    pub fn source_content(&self) -> &str {
        &self.source_content
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> &Placeholder {
        &self.placeholders[self.current_index]
    }

    pub fn value(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    /// Move to the next field; no wraparound. Returns whether it moved.
    pub fn next(&mut self) -> bool {
        self.focus(self.current_index + 1)
    }

    pub fn previous(&mut self) -> bool {
        match self.current_index.checked_sub(1) {
            Some(i) => self.focus(i),
            None => false,
        }
    }

    /// Jump to `index`, clamped to the last field.
    pub fn focus(&mut self, index: usize) -> bool {
        let clamped = index.min(self.placeholders.len() - 1);
        let moved = clamped != self.current_index;
        self.current_index = clamped;
        moved
    }

    pub fn set_current_value(&mut self, value: impl Into<String>) {
        let name = self.placeholders[self.current_index].name.clone();
        self.values.insert(name, value.into());
    }

    pub fn preview(&self) -> Preview {
        render_preview(
            &self.source_content,
            &self.placeholders,
            &self.values,
            self.current_index,
        )
    }

    pub fn finalize(&self) -> String {
        substitute_final(&self.source_content, &self.placeholders, &self.values)
    }
}
