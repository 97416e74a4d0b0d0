//! Headless document model.
//!
//! A small arena of nodes standing in for the page the engine runs against:
//! form fields, container elements and text nodes, each with a bounding box
//! and an attachment flag. The engine never owns page state; it only holds
//! `NodeId`s and must re-check `is_attached` before every write.

use core_text::{Buffer, Rect};

/// Stable handle to a node. Ids are never reused, so a handle to a detached
/// node stays detached forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// `contenteditable`-style flag on elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Editable {
    True,
    False,
    #[default]
    Inherit,
}

#[derive(Debug, Clone)]
pub struct FieldNode {
    pub multiline: bool,
    pub readonly: bool,
    pub value: Buffer,
    pub caret: usize,
}

#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: String,
    pub editable: Editable,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Field(FieldNode),
    Element(ElementNode),
    Text(Buffer),
}

#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
    rect: Rect,
    attached: bool,
}

impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
    pub fn rect(&self) -> Rect {
        self.rect
    }
}

/// Collapsed selection inside rich content: a node plus an offset. For text
/// nodes the offset counts chars; for elements it counts children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub node: NodeId,
    pub offset: usize,
}

/// An `input`-style notification observed by page-owned logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub target: NodeId,
    /// True when emitted by the engine rather than a real keystroke.
    pub synthetic: bool,
}

pub const DEFAULT_CHAR_WIDTH: f32 = 8.0;
pub const DEFAULT_LINE_HEIGHT: f32 = 20.0;

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    body: NodeId,
    focused: Option<NodeId>,
    caret: Option<Caret>,
    notifications: Vec<Notification>,
    viewport: Rect,
    char_width: f32,
    line_height: f32,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let viewport = Rect::new(0.0, 0.0, 1024.0, 768.0);
        let body = Node {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Element(ElementNode {
                tag: "body".to_string(),
                editable: Editable::False,
            }),
            rect: viewport,
            attached: true,
        };
        Self {
            nodes: vec![body],
            body: NodeId(0),
            focused: None,
            caret: None,
            notifications: Vec::new(),
            viewport,
            char_width: DEFAULT_CHAR_WIDTH,
            line_height: DEFAULT_LINE_HEIGHT,
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    pub fn char_width(&self) -> f32 {
        self.char_width
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind, rect: Rect) -> NodeId {
        let id = NodeId(self.nodes.len());
        let attached = self.is_attached(parent);
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            kind,
            rect,
            attached,
        });
        if let Some(p) = self.nodes.get_mut(parent.0) {
            p.children.push(id);
        }
        id
    }

    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        editable: Editable,
        rect: Rect,
    ) -> NodeId {
        let kind = NodeKind::Element(ElementNode {
            tag: tag.to_ascii_lowercase(),
            editable,
        });
        self.push(parent, kind, rect)
    }

    pub fn append_field(&mut self, parent: NodeId, multiline: bool, rect: Rect) -> NodeId {
        let kind = NodeKind::Field(FieldNode {
            multiline,
            readonly: false,
            value: Buffer::default(),
            caret: 0,
        });
        self.push(parent, kind, rect)
    }

    /// Text nodes share their parent's box.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let rect = self.rect(parent).unwrap_or_default();
        self.push(parent, NodeKind::Text(Buffer::new(text)), rect)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.node(id).map(|n| n.rect)
    }

    pub fn set_rect(&mut self, id: NodeId, rect: Rect) {
        if let Some(n) = self.nodes.get_mut(id.0) {
            n.rect = rect;
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.attached)
    }

    pub fn field(&self, id: NodeId) -> Option<&FieldNode> {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Field(f)) => Some(f),
            _ => None,
        }
    }

    pub fn field_mut(&mut self, id: NodeId) -> Option<&mut FieldNode> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Field(f)) => Some(f),
            _ => None,
        }
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementNode> {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn text_buffer(&self, id: NodeId) -> Option<&Buffer> {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Text(b)) => Some(b),
            _ => None,
        }
    }

    pub fn text_buffer_mut(&mut self, id: NodeId) -> Option<&mut Buffer> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Text(b)) => Some(b),
            _ => None,
        }
    }

    pub fn set_readonly(&mut self, id: NodeId, readonly: bool) {
        if let Some(f) = self.field_mut(id) {
            f.readonly = readonly;
        }
    }

    /// True when `ancestor` is `id` or one of its ancestors.
    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parent(n);
        }
        false
    }

    /// Resolved editability of an element or text node. Fields are handled by
    /// the surface resolver and never count here.
    pub fn is_content_editable(&self, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(n) = cur {
            match self.node(n).map(|node| &node.kind) {
                Some(NodeKind::Element(e)) => match e.editable {
                    Editable::True => return true,
                    Editable::False => return false,
                    Editable::Inherit => {}
                },
                Some(NodeKind::Field(_)) | None => return false,
                Some(NodeKind::Text(_)) => {}
            }
            cur = self.parent(n);
        }
        false
    }

    /// Text node descendants of `id` in document order.
    pub fn text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_text_nodes(id, &mut out);
        out
    }

    fn collect_text_nodes(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let Some(node) = self.node(id) else {
            return;
        };
        match node.kind {
            NodeKind::Text(_) => out.push(id),
            NodeKind::Element(_) => {
                for child in &node.children {
                    self.collect_text_nodes(*child, out);
                }
            }
            NodeKind::Field(_) => {}
        }
    }

    /// Concatenated text of all text descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for t in self.text_nodes(id) {
            if let Some(b) = self.text_buffer(t) {
                out.push_str(&b.to_string());
            }
        }
        out
    }

    /// Detach `id` and its subtree from the document.
    pub fn detach(&mut self, id: NodeId) {
        if id == self.body {
            return;
        }
        if let Some(parent) = self.parent(id)
            && let Some(p) = self.nodes.get_mut(parent.0)
        {
            p.children.retain(|c| *c != id);
        }
        self.mark_detached(id);
        if self.focused.is_some_and(|f| !self.is_attached(f)) {
            self.focused = None;
        }
        if self.caret.is_some_and(|c| !self.is_attached(c.node)) {
            self.caret = None;
        }
    }

    fn mark_detached(&mut self, id: NodeId) {
        let children = match self.nodes.get_mut(id.0) {
            Some(n) => {
                n.attached = false;
                n.children.clone()
            }
            None => return,
        };
        for child in children {
            self.mark_detached(child);
        }
    }

    /// Detach every child of `id`, leaving `id` itself in place.
    pub fn clear_children(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.detach(child);
        }
    }

    pub fn focus(&mut self, id: NodeId) {
        if self.is_attached(id) {
            self.focused = Some(id);
        }
    }

    pub fn blur(&mut self) {
        self.focused = None;
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn caret(&self) -> Option<Caret> {
        self.caret
    }

    pub fn set_caret(&mut self, node: NodeId, offset: usize) {
        if self.is_attached(node) {
            self.caret = Some(Caret { node, offset });
        }
    }

    pub fn notify_input(&mut self, target: NodeId, synthetic: bool) {
        self.notifications.push(Notification { target, synthetic });
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}
