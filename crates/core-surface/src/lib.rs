//! Editable surface abstraction.
//!
//! One interface (`EditableSurface`) over three concrete text hosts:
//! * `FieldSurface` - plain single or multi line form fields.
//! * `RichTextSurface` - generic rich text containers read as flat text.
//! * `BlockSurface` - block structured editors (paragraphs, list items) whose
//!   text is the per-block content joined with `\n`.
//!
//! The strategy is chosen once by `resolve_root`; callers only ever talk to
//! the trait. Every operation first checks that the surface root is still
//! attached: reads return `None` and writes return `SurfaceError::Unavailable`
//! instead of touching a detached subtree.

use core_text::Rect;
use std::fmt;
use thiserror::Error;

mod block;
mod document;
mod field;
pub mod host;
mod resolve;
mod rich;

pub use block::BlockSurface;
pub use document::{
    Caret, DEFAULT_CHAR_WIDTH, DEFAULT_LINE_HEIGHT, Document, Editable, ElementNode, FieldNode,
    Node, NodeId, NodeKind, Notification,
};
pub use field::FieldSurface;
pub use resolve::{BLOCK_TAGS, PROXY_SIZE_LIMIT, resolve_root};
pub use rich::RichTextSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("surface is no longer attached to the document")]
    Unavailable,
    #[error("surface does not support in-place range replacement here")]
    SelectionUnsupported,
    #[error("range end {end} is past the text length {len}")]
    OffsetOutOfRange { end: usize, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Field,
    RichText,
    Blocks,
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SurfaceKind::Field => "field",
            SurfaceKind::RichText => "rich_text",
            SurfaceKind::Blocks => "blocks",
        };
        f.write_str(s)
    }
}

/// Uniform read/write/cursor interface over a text host. All offsets are
/// char offsets into the string returned by `text`.
pub trait EditableSurface: fmt::Debug {
    /// Canonical root node of the surface.
    fn root(&self) -> NodeId;

    fn kind(&self) -> SurfaceKind;

    /// True when the host cannot hold line breaks.
    fn is_single_line(&self, _doc: &Document) -> bool {
        false
    }

    fn text(&self, doc: &Document) -> Option<String>;

    /// Replace the whole content. `text` is stored as given; single line hosts
    /// expect the caller to collapse newlines first.
    fn set_text(&self, doc: &mut Document, text: &str) -> Result<(), SurfaceError>;

    fn cursor_offset(&self, doc: &Document) -> Option<usize>;

    /// Place the caret, clamping to `[0, len]`. Returns the applied offset.
    fn set_cursor_offset(&self, doc: &mut Document, offset: usize) -> Result<usize, SurfaceError>;

    /// Caret box for UI anchoring, falling back to the root's box.
    fn caret_rect(&self, doc: &Document) -> Option<Rect>;

    /// Preferred in-place mutation: replace `[start,end)` with `text` and put
    /// the caret after it. Returns the new caret offset. A range reaching past
    /// the current text is rejected with `OffsetOutOfRange`.
    fn replace_range(
        &self,
        doc: &mut Document,
        start: usize,
        end: usize,
        text: &str,
    ) -> Result<usize, SurfaceError>;

    fn is_live(&self, doc: &Document) -> bool {
        doc.is_attached(self.root())
    }

    /// Emit a synthetic input notification so page logic observes the change.
    fn notify_changed(&self, doc: &mut Document) {
        if self.is_live(doc) {
            doc.notify_input(self.root(), true);
        }
    }

    fn focus(&self, doc: &mut Document) {
        doc.focus(self.root());
    }
}

/// Char offset of `caret` relative to the text content of `container`, or
/// `None` when the caret lies outside it.
pub(crate) fn offset_within(doc: &Document, container: NodeId, caret: Caret) -> Option<usize> {
    if !doc.contains(container, caret.node) {
        return None;
    }
    let mut acc = 0usize;
    caret_walk(doc, container, caret, &mut acc).then_some(acc)
}

pub(crate) fn text_len(doc: &Document, id: NodeId) -> usize {
    doc.text_nodes(id)
        .iter()
        .filter_map(|t| doc.text_buffer(*t))
        .map(|b| b.len_chars())
        .sum()
}

fn caret_walk(doc: &Document, node: NodeId, caret: Caret, acc: &mut usize) -> bool {
    if node == caret.node {
        if let Some(b) = doc.text_buffer(node) {
            *acc += caret.offset.min(b.len_chars());
        } else {
            // Element caret: offset counts children.
            for child in doc.children(node).iter().take(caret.offset) {
                *acc += text_len(doc, *child);
            }
        }
        return true;
    }
    if let Some(b) = doc.text_buffer(node) {
        *acc += b.len_chars();
        return false;
    }
    doc.children(node)
        .iter()
        .any(|child| caret_walk(doc, *child, caret, acc))
}

/// Map a container-relative char offset to `(text node, local offset)`.
/// Boundaries resolve to the end of the earlier node.
pub(crate) fn locate(doc: &Document, container: NodeId, offset: usize) -> Option<(NodeId, usize)> {
    let mut consumed = 0usize;
    let mut last = None;
    for t in doc.text_nodes(container) {
        let len = doc.text_buffer(t).map(|b| b.len_chars()).unwrap_or(0);
        if offset <= consumed + len {
            return Some((t, offset - consumed));
        }
        consumed += len;
        last = Some((t, len));
    }
    last
}
