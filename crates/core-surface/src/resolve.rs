//! Canonical root resolution and strategy selection.

use crate::{BlockSurface, Document, EditableSurface, FieldSurface, NodeId, NodeKind, RichTextSurface};
use tracing::{debug, trace};

/// Fields at or below this width/height are treated as hidden proxies.
pub const PROXY_SIZE_LIMIT: f32 = 2.0;

/// How far up a proxy field looks for the editor it backs.
const PROXY_SEARCH_DEPTH: usize = 3;

/// Element tags that make a root block structured when they are its only
/// element children.
pub const BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "li",
    "ul",
    "ol",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "pre",
];

/// Resolve the editable surface for `node`: the node the user focused or has
/// a selection inside. Returns `None` for detached, read-only or
/// non-editable nodes.
pub fn resolve_root(doc: &Document, node: NodeId) -> Option<Box<dyn EditableSurface>> {
    if !doc.is_attached(node) {
        trace!(target: "surface.resolve", node = node.index(), "detached");
        return None;
    }
    match doc.node(node)?.kind() {
        NodeKind::Field(field) => {
            if field.readonly {
                return None;
            }
            let rect = doc.rect(node).unwrap_or_default();
            if rect.is_degenerate(PROXY_SIZE_LIMIT)
                && let Some(editor) = find_proxied_editor(doc, node)
            {
                debug!(target: "surface.resolve", proxy = node.index(), editor = editor.index(), "proxy_redirect");
                return Some(strategy_for(doc, editor));
            }
            Some(Box::new(FieldSurface::new(node)))
        }
        NodeKind::Text(_) => {
            let parent = doc.parent(node)?;
            resolve_root(doc, parent)
        }
        NodeKind::Element(_) => {
            if !doc.is_content_editable(node) {
                return None;
            }
            let root = editable_root(doc, node);
            Some(strategy_for(doc, root))
        }
    }
}

/// Climb to the outermost editable ancestor.
fn editable_root(doc: &Document, node: NodeId) -> NodeId {
    let mut root = node;
    while let Some(parent) = doc.parent(root) {
        if doc.element(parent).is_none() || !doc.is_content_editable(parent) {
            break;
        }
        root = parent;
    }
    root
}

/// Block structured when every element child is a block tag and no bare
/// text sits between them.
fn is_block_structured(doc: &Document, root: NodeId) -> bool {
    let bare_text = doc
        .children(root)
        .iter()
        .filter_map(|c| doc.text_buffer(*c))
        .any(|b| !b.to_string().trim().is_empty());
    if bare_text {
        return false;
    }
    let mut elements = doc
        .children(root)
        .iter()
        .filter_map(|c| doc.element(*c))
        .peekable();
    elements.peek().is_some() && elements.all(|e| BLOCK_TAGS.contains(&e.tag.as_str()))
}

fn strategy_for(doc: &Document, root: NodeId) -> Box<dyn EditableSurface> {
    let surface: Box<dyn EditableSurface> = if is_block_structured(doc, root) {
        Box::new(BlockSurface::new(root))
    } else {
        Box::new(RichTextSurface::new(root))
    };
    trace!(target: "surface.resolve", root = root.index(), kind = %surface.kind(), "strategy_selected");
    surface
}

/// Search a few ancestor levels for a visible rich editor root other than the
/// proxy itself.
fn find_proxied_editor(doc: &Document, proxy: NodeId) -> Option<NodeId> {
    let mut scope = doc.parent(proxy);
    for _ in 0..PROXY_SEARCH_DEPTH {
        let ancestor = scope?;
        if let Some(found) = find_editor_root(doc, ancestor, proxy) {
            return Some(found);
        }
        scope = doc.parent(ancestor);
    }
    None
}

fn find_editor_root(doc: &Document, node: NodeId, skip: NodeId) -> Option<NodeId> {
    for child in doc.children(node) {
        if *child == skip {
            continue;
        }
        if doc.element(*child).is_some() && doc.is_content_editable(*child) {
            let visible = doc
                .rect(*child)
                .is_some_and(|r| !r.is_degenerate(PROXY_SIZE_LIMIT));
            if visible {
                return Some(editable_root(doc, *child));
            }
        }
        if let Some(found) = find_editor_root(doc, *child, skip) {
            return Some(found);
        }
    }
    None
}
