use crate::{
    Document, EditableSurface, NodeId, SurfaceError, SurfaceKind, locate, offset_within, text_len,
};
use core_text::{Rect, char_len, slice_chars};
use tracing::trace;

/// Generic rich text container read as flat text: the concatenated content of
/// every text node under the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RichTextSurface {
    root: NodeId,
}

impl RichTextSurface {
    pub fn new(root: NodeId) -> Self {
        Self { root }
    }
}

/// Caret box for `offset` inside flat text laid out from `origin`.
pub(crate) fn caret_box(doc: &Document, origin: Rect, text: &str, offset: usize) -> Rect {
    let prefix = slice_chars(text, 0, offset);
    let row = prefix.matches('\n').count();
    let col = prefix.rsplit('\n').next().map(char_len).unwrap_or(0);
    let x = (origin.x + col as f32 * doc.char_width()).min(origin.right());
    let y = origin.y + row as f32 * doc.line_height();
    Rect::new(x, y, 1.0, doc.line_height())
}

impl EditableSurface for RichTextSurface {
    fn root(&self) -> NodeId {
        self.root
    }

    fn kind(&self) -> SurfaceKind {
        SurfaceKind::RichText
    }

    fn text(&self, doc: &Document) -> Option<String> {
        if !self.is_live(doc) {
            return None;
        }
        Some(doc.text_content(self.root))
    }

    fn set_text(&self, doc: &mut Document, text: &str) -> Result<(), SurfaceError> {
        if !self.is_live(doc) {
            return Err(SurfaceError::Unavailable);
        }
        doc.clear_children(self.root);
        if text.is_empty() {
            doc.set_caret(self.root, 0);
        } else {
            let t = doc.append_text(self.root, text);
            doc.set_caret(t, char_len(text));
        }
        Ok(())
    }

    fn cursor_offset(&self, doc: &Document) -> Option<usize> {
        if !self.is_live(doc) {
            return None;
        }
        let len = char_len(&doc.text_content(self.root));
        // A caret outside the root reads as the end of the content.
        let offset = doc
            .caret()
            .and_then(|c| offset_within(doc, self.root, c))
            .unwrap_or(len);
        Some(offset.min(len))
    }

    fn set_cursor_offset(&self, doc: &mut Document, offset: usize) -> Result<usize, SurfaceError> {
        if !self.is_live(doc) {
            return Err(SurfaceError::Unavailable);
        }
        let len = char_len(&doc.text_content(self.root));
        let clamped = offset.min(len);
        match locate(doc, self.root, clamped) {
            Some((node, local)) => doc.set_caret(node, local),
            None => doc.set_caret(self.root, 0),
        }
        Ok(clamped)
    }

    fn caret_rect(&self, doc: &Document) -> Option<Rect> {
        if !self.is_live(doc) {
            return None;
        }
        let root_rect = doc.rect(self.root)?;
        let text = doc.text_content(self.root);
        if text.is_empty() {
            return Some(root_rect);
        }
        let offset = self.cursor_offset(doc)?;
        Some(caret_box(doc, root_rect, &text, offset))
    }

    fn replace_range(
        &self,
        doc: &mut Document,
        start: usize,
        end: usize,
        text: &str,
    ) -> Result<usize, SurfaceError> {
        if !self.is_live(doc) {
            return Err(SurfaceError::Unavailable);
        }
        let caret_inside = doc
            .caret()
            .is_some_and(|c| doc.contains(self.root, c.node));
        if !caret_inside {
            return Err(SurfaceError::SelectionUnsupported);
        }
        let (start, end) = (start.min(end), start.max(end));
        let len = text_len(doc, self.root);
        if end > len {
            return Err(SurfaceError::OffsetOutOfRange { end, len });
        }
        let (Some((a, local_start)), Some((b, local_end))) =
            (locate(doc, self.root, start), locate(doc, self.root, end))
        else {
            return Err(SurfaceError::SelectionUnsupported);
        };
        // In-place editing only spans a single text node.
        if a != b {
            return Err(SurfaceError::SelectionUnsupported);
        }
        let buffer = doc
            .text_buffer_mut(a)
            .ok_or(SurfaceError::SelectionUnsupported)?;
        let local_caret = buffer.replace(local_start, local_end, text);
        doc.set_caret(a, local_caret);
        trace!(target: "surface", kind = "rich_text", start, end, inserted = text.len(), "replace_range");
        Ok(start + char_len(text))
    }
}
