use crate::rich::caret_box;
use crate::{
    Document, Editable, EditableSurface, NodeId, SurfaceError, SurfaceKind, locate, offset_within,
};
use core_text::{Rect, char_len};
use tracing::trace;

/// Block structured editor. Text is the content of each block element joined
/// with `\n`; list containers contribute one block per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSurface {
    root: NodeId,
}

/// One block with its global start offset and char length.
#[derive(Debug, Clone, Copy)]
struct Span {
    node: NodeId,
    start: usize,
    len: usize,
}

const REBUILD_TAGS: &[&str] = &["p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre"];

impl BlockSurface {
    pub fn new(root: NodeId) -> Self {
        Self { root }
    }

    fn blocks(&self, doc: &Document) -> Vec<NodeId> {
        let mut out = Vec::new();
        for child in doc.children(self.root) {
            let Some(el) = doc.element(*child) else {
                continue;
            };
            if el.tag == "ul" || el.tag == "ol" {
                out.extend(
                    doc.children(*child)
                        .iter()
                        .copied()
                        .filter(|c| doc.element(*c).is_some()),
                );
            } else {
                out.push(*child);
            }
        }
        out
    }

    fn spans(&self, doc: &Document) -> Vec<Span> {
        let mut start = 0usize;
        self.blocks(doc)
            .into_iter()
            .map(|node| {
                let len = char_len(&doc.text_content(node));
                let span = Span { node, start, len };
                start += len + 1;
                span
            })
            .collect()
    }

    fn total_len(spans: &[Span]) -> usize {
        spans.last().map(|s| s.start + s.len).unwrap_or(0)
    }

    /// Block holding the global `offset`; boundaries resolve to the earlier block.
    fn span_at(spans: &[Span], offset: usize) -> Option<Span> {
        spans
            .iter()
            .find(|s| offset <= s.start + s.len)
            .or(spans.last())
            .copied()
    }

    fn rebuild_tag(&self, doc: &Document) -> String {
        doc.children(self.root)
            .iter()
            .find_map(|c| doc.element(*c))
            .map(|e| e.tag.as_str())
            .filter(|t| REBUILD_TAGS.contains(t))
            .unwrap_or("p")
            .to_string()
    }
}

impl EditableSurface for BlockSurface {
    fn root(&self) -> NodeId {
        self.root
    }

    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Blocks
    }

    fn text(&self, doc: &Document) -> Option<String> {
        if !self.is_live(doc) {
            return None;
        }
        let parts: Vec<String> = self
            .blocks(doc)
            .into_iter()
            .map(|b| doc.text_content(b))
            .collect();
        Some(parts.join("\n"))
    }

    fn set_text(&self, doc: &mut Document, text: &str) -> Result<(), SurfaceError> {
        if !self.is_live(doc) {
            return Err(SurfaceError::Unavailable);
        }
        let tag = self.rebuild_tag(doc);
        let origin = doc.rect(self.root).unwrap_or_default();
        let line_height = doc.line_height();
        doc.clear_children(self.root);
        let mut last = None;
        for (i, line) in text.split('\n').enumerate() {
            let rect = Rect::new(
                origin.x,
                origin.y + i as f32 * line_height,
                origin.width,
                line_height,
            );
            let block = doc.append_element(self.root, &tag, Editable::Inherit, rect);
            last = Some(if line.is_empty() {
                (block, 0)
            } else {
                (doc.append_text(block, line), char_len(line))
            });
        }
        if let Some((node, offset)) = last {
            doc.set_caret(node, offset);
        }
        trace!(target: "surface", kind = "blocks", blocks = text.split('\n').count(), "set_text");
        Ok(())
    }

    fn cursor_offset(&self, doc: &Document) -> Option<usize> {
        if !self.is_live(doc) {
            return None;
        }
        let spans = self.spans(doc);
        let total = Self::total_len(&spans);
        let Some(caret) = doc.caret().filter(|c| doc.contains(self.root, c.node)) else {
            return Some(total);
        };
        if caret.node == self.root {
            // Root caret counts children; map to the start of that block.
            let offset = spans
                .iter()
                .find(|s| {
                    doc.children(self.root)
                        .get(caret.offset)
                        .is_some_and(|c| doc.contains(*c, s.node))
                })
                .map(|s| s.start)
                .unwrap_or(total);
            return Some(offset);
        }
        let offset = spans
            .iter()
            .find(|s| doc.contains(s.node, caret.node))
            .and_then(|s| offset_within(doc, s.node, caret).map(|local| s.start + local))
            .unwrap_or(total);
        Some(offset.min(total))
    }

    fn set_cursor_offset(&self, doc: &mut Document, offset: usize) -> Result<usize, SurfaceError> {
        if !self.is_live(doc) {
            return Err(SurfaceError::Unavailable);
        }
        let spans = self.spans(doc);
        let clamped = offset.min(Self::total_len(&spans));
        match Self::span_at(&spans, clamped) {
            Some(span) => {
                let local = clamped - span.start;
                match locate(doc, span.node, local) {
                    Some((node, l)) => doc.set_caret(node, l),
                    None => doc.set_caret(span.node, 0),
                }
            }
            None => doc.set_caret(self.root, 0),
        }
        Ok(clamped)
    }

    fn caret_rect(&self, doc: &Document) -> Option<Rect> {
        if !self.is_live(doc) {
            return None;
        }
        let root_rect = doc.rect(self.root)?;
        let spans = self.spans(doc);
        if Self::total_len(&spans) == 0 {
            return Some(root_rect);
        }
        let offset = self.cursor_offset(doc)?;
        let span = Self::span_at(&spans, offset)?;
        let block_rect = doc.rect(span.node).unwrap_or(root_rect);
        let block_text = doc.text_content(span.node);
        Some(caret_box(doc, block_rect, &block_text, offset - span.start))
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
        if !caret_inside || text.contains('\n') {
            return Err(SurfaceError::SelectionUnsupported);
        }
        let (start, end) = (start.min(end), start.max(end));
        let spans = self.spans(doc);
        let len = spans.last().map(|s| s.start + s.len).unwrap_or(0);
        if end > len {
            return Err(SurfaceError::OffsetOutOfRange { end, len });
        }
        let (Some(a), Some(b)) = (Self::span_at(&spans, start), Self::span_at(&spans, end)) else {
            return Err(SurfaceError::SelectionUnsupported);
        };
        if a.node != b.node {
            return Err(SurfaceError::SelectionUnsupported);
        }
        let local_start = start.saturating_sub(a.start).min(a.len);
        let local_end = end.saturating_sub(a.start).min(a.len);
        let (node, ls, le) = match (locate(doc, a.node, local_start), locate(doc, a.node, local_end))
        {
            (Some((n1, ls)), Some((n2, le))) if n1 == n2 => (n1, ls, le),
            (None, None) => (doc.append_text(a.node, ""), 0, 0),
            _ => return Err(SurfaceError::SelectionUnsupported),
        };
        let buffer = doc
            .text_buffer_mut(node)
            .ok_or(SurfaceError::SelectionUnsupported)?;
        let local_caret = buffer.replace(ls, le, text);
        doc.set_caret(node, local_caret);
        trace!(target: "surface", kind = "blocks", start, end, inserted = text.len(), "replace_range");
        Ok(a.start + local_start + char_len(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn editor(doc: &mut Document) -> BlockSurface {
        let root = doc.append_element(
            doc.body(),
            "div",
            Editable::True,
            Rect::new(0.0, 200.0, 500.0, 100.0),
        );
        BlockSurface::new(root)
    }

    fn paragraph(doc: &mut Document, root: NodeId, text: &str) -> NodeId {
        let p = doc.append_element(root, "p", Editable::Inherit, Rect::default());
        if !text.is_empty() {
            doc.append_text(p, text);
        }
        p
    }

    #[test]
    fn text_joins_blocks_with_newline() {
        let mut doc = Document::new();
        let s = editor(&mut doc);
        paragraph(&mut doc, s.root(), "first");
        paragraph(&mut doc, s.root(), "");
        let ul = doc.append_element(s.root(), "ul", Editable::Inherit, Rect::default());
        let li = doc.append_element(ul, "li", Editable::Inherit, Rect::default());
        doc.append_text(li, "item");
        assert_eq!(s.text(&doc).as_deref(), Some("first\n\nitem"));
    }

    #[test]
    fn cursor_offset_uses_block_join_rule() {
        let mut doc = Document::new();
        let s = editor(&mut doc);
        paragraph(&mut doc, s.root(), "ab");
        let p2 = paragraph(&mut doc, s.root(), "cde");
        let t2 = doc.children(p2)[0];
        doc.set_caret(t2, 2);
        assert_eq!(s.cursor_offset(&doc), Some(5));
        assert_eq!(s.set_cursor_offset(&mut doc, 2).unwrap(), 2);
        assert_eq!(s.cursor_offset(&doc), Some(2));
        assert_eq!(s.set_cursor_offset(&mut doc, 3).unwrap(), 3);
        assert_eq!(doc.caret().map(|c| c.node), Some(t2));
    }

    #[test]
    fn empty_block_caret_sits_on_element() {
        let mut doc = Document::new();
        let s = editor(&mut doc);
        paragraph(&mut doc, s.root(), "ab");
        let empty = paragraph(&mut doc, s.root(), "");
        s.set_cursor_offset(&mut doc, 3).unwrap();
        assert_eq!(doc.caret().map(|c| c.node), Some(empty));
        assert_eq!(s.cursor_offset(&doc), Some(3));
    }

    #[test]
    fn replace_within_block_is_in_place() {
        let mut doc = Document::new();
        let s = editor(&mut doc);
        paragraph(&mut doc, s.root(), "intro");
        paragraph(&mut doc, s.root(), "AI:Gre");
        s.set_cursor_offset(&mut doc, 12).unwrap();
        assert_eq!(s.replace_range(&mut doc, 6, 12, "Hello World!"), Ok(18));
        assert_eq!(s.text(&doc).as_deref(), Some("intro\nHello World!"));
        assert_eq!(s.cursor_offset(&doc), Some(18));
    }

    #[test]
    fn multi_line_insert_needs_rebuild() {
        let mut doc = Document::new();
        let s = editor(&mut doc);
        paragraph(&mut doc, s.root(), "x");
        s.set_cursor_offset(&mut doc, 1).unwrap();
        assert_eq!(
            s.replace_range(&mut doc, 0, 1, "a\nb"),
            Err(SurfaceError::SelectionUnsupported)
        );
    }

    #[test]
    fn rebuild_keeps_first_block_tag() {
        let mut doc = Document::new();
        let s = editor(&mut doc);
        doc.append_element(s.root(), "div", Editable::Inherit, Rect::default());
        s.set_text(&mut doc, "a\nb").unwrap();
        let tags: Vec<String> = doc
            .children(s.root())
            .iter()
            .filter_map(|c| doc.element(*c).map(|e| e.tag.clone()))
            .collect();
        assert_eq!(tags, vec!["div".to_string(), "div".to_string()]);
    }

    #[test]
    fn caret_rect_uses_block_box() {
        let mut doc = Document::new();
        let s = editor(&mut doc);
        assert_eq!(s.caret_rect(&doc), doc.rect(s.root()));
        s.set_text(&mut doc, "ab\ncd").unwrap();
        s.set_cursor_offset(&mut doc, 4).unwrap();
        let r = s.caret_rect(&doc).unwrap();
        assert_eq!(r.x, 8.0);
        assert_eq!(r.y, 220.0);
    }

    proptest! {
        #[test]
        fn set_text_round_trips(lines in proptest::collection::vec("[ -~]{0,12}", 1..6)) {
            let mut doc = Document::new();
            let s = editor(&mut doc);
            let text = lines.join("\n");
            s.set_text(&mut doc, &text).unwrap();
            prop_assert_eq!(s.text(&doc), Some(text.clone()));
            prop_assert_eq!(s.cursor_offset(&doc), Some(char_len(&text)));
        }
    }
}
