use crate::{Document, EditableSurface, NodeId, SurfaceError, SurfaceKind};
use core_text::Rect;
use tracing::trace;

/// Plain form field (`input` / `textarea`). The value is flat text and the
/// caret is a char offset into it; range replacement is always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSurface {
    root: NodeId,
}

impl FieldSurface {
    pub fn new(root: NodeId) -> Self {
        Self { root }
    }
}

impl EditableSurface for FieldSurface {
    fn root(&self) -> NodeId {
        self.root
    }

    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Field
    }

    fn is_single_line(&self, doc: &Document) -> bool {
        doc.field(self.root).is_some_and(|f| !f.multiline)
    }

    fn text(&self, doc: &Document) -> Option<String> {
        if !self.is_live(doc) {
            return None;
        }
        doc.field(self.root).map(|f| f.value.to_string())
    }

    fn set_text(&self, doc: &mut Document, text: &str) -> Result<(), SurfaceError> {
        if !self.is_live(doc) {
            return Err(SurfaceError::Unavailable);
        }
        let field = doc.field_mut(self.root).ok_or(SurfaceError::Unavailable)?;
        field.value.set(text);
        field.caret = field.caret.min(field.value.len_chars());
        Ok(())
    }

    fn cursor_offset(&self, doc: &Document) -> Option<usize> {
        if !self.is_live(doc) {
            return None;
        }
        doc.field(self.root)
            .map(|f| f.caret.min(f.value.len_chars()))
    }

    fn set_cursor_offset(&self, doc: &mut Document, offset: usize) -> Result<usize, SurfaceError> {
        if !self.is_live(doc) {
            return Err(SurfaceError::Unavailable);
        }
        let field = doc.field_mut(self.root).ok_or(SurfaceError::Unavailable)?;
        field.caret = offset.min(field.value.len_chars());
        Ok(field.caret)
    }

    fn caret_rect(&self, doc: &Document) -> Option<Rect> {
        if !self.is_live(doc) {
            return None;
        }
        // Fields expose no caret geometry; anchor to the field box.
        doc.rect(self.root)
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
        let field = doc.field_mut(self.root).ok_or(SurfaceError::Unavailable)?;
        let len = field.value.len_chars();
        if start.max(end) > len {
            return Err(SurfaceError::OffsetOutOfRange {
                end: start.max(end),
                len,
            });
        }
        let caret = field.value.replace(start, end, text);
        field.caret = caret;
        trace!(target: "surface", kind = "field", start, end, inserted = text.len(), "replace_range");
        Ok(caret)
    }
}
