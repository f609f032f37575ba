//! Immutable document nodes.
//!
//! # Positions
//!
//! Positions count tokens in document order: entering or leaving a non-leaf
//! node is one token, every character of text is one token, and a leaf node
//! is one token. Position 0 is the start of the top node's content.
//!
//! ```text
//! 0   1 2 3 4    5   6 7 8 9    10
//!  <p> O n e </p> <p> T w o </p>
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::{
    Attrs, Fragment, Mark, MarkType, ModelError, NodeType, ResolvedPos, Slice, TRACK_ATTR,
    TrackAttr, TrackKind, find_mark, mark::normalize_marks, replace,
};

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeJson", into = "NodeJson")]
pub struct Node {
    node_type: NodeType,
    attrs: Attrs,
    content: Fragment,
    marks: Vec<Mark>,
    text: Option<String>,
    /// Length of `text` in chars, cached.
    text_len: usize,
}

impl Node {
    /// Create a non-text node. `attrs` are layered over the type's defaults.
    pub fn new(node_type: NodeType, attrs: Attrs, content: Fragment, marks: Vec<Mark>) -> Self {
        let mut merged = node_type.default_attrs();
        merged.extend(attrs);
        Self {
            node_type,
            attrs: merged,
            content,
            marks: normalize_marks(marks),
            text: None,
            text_len: 0,
        }
    }

    /// Create a text node. Empty text is not a valid node; callers skip it.
    pub fn text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        let text = text.into();
        let text_len = text.chars().count();
        Self {
            node_type: NodeType::Text,
            attrs: Attrs::new(),
            content: Fragment::empty(),
            marks: normalize_marks(marks),
            text: Some(text),
            text_len,
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn has_mark(&self, mark_type: MarkType) -> bool {
        find_mark(&self.marks, mark_type).is_some()
    }

    /// The text of a text node.
    pub fn text_str(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_text(&self) -> bool {
        self.node_type.is_text()
    }

    pub fn is_inline(&self) -> bool {
        self.node_type.is_inline()
    }

    pub fn is_block(&self) -> bool {
        self.node_type.is_block()
    }

    pub fn is_textblock(&self) -> bool {
        self.node_type.is_textblock()
    }

    pub fn is_leaf(&self) -> bool {
        self.node_type.is_leaf()
    }

    /// Size of this node in positions.
    pub fn node_size(&self) -> usize {
        if self.is_text() {
            self.text_len
        } else if self.is_leaf() {
            1
        } else {
            self.content.size() + 2
        }
    }

    pub fn content_size(&self) -> usize {
        self.content.size()
    }

    pub fn child_count(&self) -> usize {
        self.content.child_count()
    }

    pub fn child(&self, index: usize) -> &Node {
        self.content.child(index)
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.content.maybe_child(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.first_child()
    }

    /// Same type, attributes and marks.
    pub fn same_markup(&self, other: &Node) -> bool {
        self.node_type == other.node_type && self.attrs == other.attrs && self.marks == other.marks
    }

    /// Same markup with different content.
    pub fn copy(&self, content: Fragment) -> Node {
        Node {
            node_type: self.node_type,
            attrs: self.attrs.clone(),
            content,
            marks: self.marks.clone(),
            text: self.text.clone(),
            text_len: self.text_len,
        }
    }

    /// Same node with a different mark set.
    pub fn with_marks(&self, marks: Vec<Mark>) -> Node {
        let mut node = self.clone();
        node.marks = normalize_marks(marks);
        node
    }

    /// Same node with different attributes, no defaults applied.
    pub fn with_attrs(&self, attrs: Attrs) -> Node {
        let mut node = self.clone();
        node.attrs = attrs;
        node
    }

    pub(crate) fn with_text(&self, text: String) -> Node {
        Node::text(text, self.marks.clone())
    }

    /// Cut out the part of this node between two content offsets.
    pub fn cut(&self, from: usize, to: usize) -> Node {
        match &self.text {
            Some(text) => {
                if from == 0 && to >= self.text_len {
                    return self.clone();
                }
                self.with_text(char_slice(text, from, to).to_owned())
            }
            None => {
                if from == 0 && to >= self.content.size() {
                    return self.clone();
                }
                self.copy(self.content.cut(from, to))
            }
        }
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => {
                let mut out = String::new();
                for child in self.content.iter() {
                    out.push_str(&child.text_content());
                }
                out
            }
        }
    }

    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos<'_>, ModelError> {
        ResolvedPos::resolve(self, pos)
    }

    /// The node starting at `pos`, if any.
    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        let mut node = self;
        let mut pos = pos;
        loop {
            let (index, offset) = node.content.find_index(pos).ok()?;
            let child = node.content.maybe_child(index)?;
            if offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= offset + 1;
            node = child;
        }
    }

    /// Slice of the document between two positions.
    pub fn slice(&self, from: usize, to: usize) -> Result<Slice, ModelError> {
        if from == to {
            return Ok(Slice::empty());
        }
        if from > to {
            return Err(ModelError::ReversedRange { from, to });
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        let depth = rfrom.shared_depth(to);
        let start = rfrom.start(depth);
        let node = rfrom.node(depth);
        let content = node.content.cut(rfrom.pos() - start, rto.pos() - start);
        Ok(Slice::new(content, rfrom.depth() - depth, rto.depth() - depth))
    }

    /// Replace the range `from..to` with a slice.
    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> Result<Node, ModelError> {
        if from > to {
            return Err(ModelError::ReversedRange { from, to });
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        replace::replace(&rfrom, &rto, slice)
    }

    /// Whether the node carries a `track` attribute at all.
    pub fn has_track_attr(&self) -> bool {
        self.attrs.contains_key(TRACK_ATTR)
    }

    /// Decoded track annotations. A malformed list reads as empty.
    pub fn track(&self) -> Vec<TrackAttr> {
        match self.attrs.get(TRACK_ATTR) {
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                trace!("ignoring malformed track attribute: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    pub fn has_track(&self, kind: TrackKind) -> bool {
        self.track().iter().any(|t| t.kind == kind)
    }

    /// Check that `content` is valid for this node's type.
    pub(crate) fn check_content(node_type: NodeType, content: &Fragment) -> Result<(), ModelError> {
        if content.iter().all(|child| node_type.accepts(child.node_type())) {
            Ok(())
        } else {
            Err(ModelError::InvalidContent(node_type))
        }
    }
}

/// Substring by char offsets.
pub(crate) fn char_slice(text: &str, from: usize, to: usize) -> &str {
    let mut indices = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len()));
    let start = indices.nth(from).unwrap_or(text.len());
    let end = if to > from {
        indices.nth(to - from - 1).unwrap_or(text.len())
    } else {
        start
    };
    &text[start..end]
}

/// JSON form: `{type, attrs?, content?, marks?, text?}`.
#[derive(Serialize, Deserialize)]
struct NodeJson {
    #[serde(rename = "type")]
    node_type: NodeType,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    marks: Vec<Mark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl TryFrom<NodeJson> for Node {
    type Error = ModelError;

    fn try_from(json: NodeJson) -> Result<Self, Self::Error> {
        match (json.node_type, json.text) {
            (NodeType::Text, Some(text)) if text.is_empty() => Err(ModelError::EmptyText),
            (NodeType::Text, Some(text)) => Ok(Node::text(text, json.marks)),
            (NodeType::Text, None) => Err(ModelError::TextMismatch(NodeType::Text)),
            (other, Some(_)) => Err(ModelError::TextMismatch(other)),
            (node_type, None) => {
                let content = Fragment::from_nodes(json.content);
                Node::check_content(node_type, &content)?;
                Ok(Node::new(node_type, json.attrs, content, json.marks))
            }
        }
    }
}

impl From<Node> for NodeJson {
    fn from(node: Node) -> Self {
        NodeJson {
            node_type: node.node_type,
            attrs: node.attrs,
            content: node.content.into_nodes(),
            marks: node.marks,
            text: node.text,
        }
    }
}
