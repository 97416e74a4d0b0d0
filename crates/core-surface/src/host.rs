//! User input simulation against the focused surface.
//!
//! These helpers play the part of the browser: they apply a keystroke's text
//! effect to whatever surface currently has focus and emit a non-synthetic
//! input notification, exactly what page scripts and the engine observe for
//! real typing.

use crate::{Document, EditableSurface, NodeId, resolve_root};
use core_text::replace_chars;

fn focused_surface(doc: &Document) -> Option<Box<dyn EditableSurface>> {
    let target = doc.focused().or_else(|| doc.caret().map(|c| c.node))?;
    resolve_root(doc, target)
}

/// Insert `text` at the caret of the focused surface. Returns the surface
/// root that received the input.
pub fn type_text(doc: &mut Document, text: &str) -> Option<NodeId> {
    let surface = focused_surface(doc)?;
    let caret = surface.cursor_offset(doc)?;
    if surface.replace_range(doc, caret, caret, text).is_err() {
        let current = surface.text(doc)?;
        surface.set_text(doc, &replace_chars(&current, caret, caret, text)).ok()?;
        surface
            .set_cursor_offset(doc, caret + text.chars().count())
            .ok()?;
    }
    doc.notify_input(surface.root(), false);
    Some(surface.root())
}

/// Delete the char before the caret of the focused surface.
pub fn press_backspace(doc: &mut Document) -> Option<NodeId> {
    let surface = focused_surface(doc)?;
    let caret = surface.cursor_offset(doc)?;
    if caret == 0 {
        return Some(surface.root());
    }
    if surface.replace_range(doc, caret - 1, caret, "").is_err() {
        let current = surface.text(doc)?;
        surface.set_text(doc, &replace_chars(&current, caret - 1, caret, "")).ok()?;
        surface.set_cursor_offset(doc, caret - 1).ok()?;
    }
    doc.notify_input(surface.root(), false);
    Some(surface.root())
}

/// Move the caret of the focused surface (arrow keys, clicks).
pub fn move_caret(doc: &mut Document, offset: usize) -> Option<NodeId> {
    let surface = focused_surface(doc)?;
    surface.set_cursor_offset(doc, offset).ok()?;
    Some(surface.root())
}
