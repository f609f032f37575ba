//! Ordered node sequences.

use crate::{ModelError, Node};

/// A node's children. Adjacent text nodes with the same marks are merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    nodes: Vec<Node>,
    size: usize,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_node(node: Node) -> Self {
        let size = node.node_size();
        Self { nodes: vec![node], size }
    }

    /// Build a fragment, joining adjacent text nodes that share marks.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut joined: Vec<Node> = Vec::new();
        for node in nodes {
            push_joined(&mut joined, node);
        }
        let size = joined.iter().map(Node::node_size).sum();
        Self { nodes: joined, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn child_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn child(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.nodes.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub(crate) fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    /// The part of this fragment between two offsets.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to >= self.size {
            return self.clone();
        }
        let mut result = Vec::new();
        let mut size = 0;
        if to > from {
            let mut pos = 0;
            for child in &self.nodes {
                if pos >= to {
                    break;
                }
                let end = pos + child.node_size();
                if end > from {
                    let child = if pos < from || end > to {
                        if child.is_text() {
                            child.cut(from.saturating_sub(pos), (to - pos).min(child.node_size()))
                        } else {
                            child.cut(
                                from.saturating_sub(pos + 1),
                                (to - pos).saturating_sub(1).min(child.content_size()),
                            )
                        }
                    } else {
                        child.clone()
                    };
                    size += child.node_size();
                    result.push(child);
                }
                pos = end;
            }
        }
        Fragment { nodes: result, size }
    }

    /// Concatenate two fragments, joining text at the seam.
    pub fn append(&self, other: &Fragment) -> Fragment {
        if other.size == 0 && other.nodes.is_empty() {
            return self.clone();
        }
        if self.nodes.is_empty() {
            return other.clone();
        }
        let mut nodes = self.nodes.clone();
        for node in &other.nodes {
            push_joined(&mut nodes, node.clone());
        }
        Fragment { nodes, size: self.size + other.size }
    }

    /// Replace the child at `index`.
    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let mut nodes = self.nodes.clone();
        let old = std::mem::replace(&mut nodes[index], node);
        let size = self.size - old.node_size() + nodes[index].node_size();
        Fragment { nodes, size }
    }

    /// Index of the child containing `pos` and that child's start offset.
    /// A position on a boundary resolves to the child after it.
    pub fn find_index(&self, pos: usize) -> Result<(usize, usize), ModelError> {
        if pos == 0 {
            return Ok((0, 0));
        }
        if pos == self.size {
            return Ok((self.nodes.len(), pos));
        }
        if pos > self.size {
            return Err(ModelError::PositionOutOfRange { pos, size: self.size });
        }
        let mut cur = 0;
        for (i, child) in self.nodes.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                if end == pos {
                    return Ok((i + 1, end));
                }
                return Ok((i, cur));
            }
            cur = end;
        }
        Err(ModelError::PositionOutOfRange { pos, size: self.size })
    }
}

/// Push `node`, merging it into the last node when both are text with the
/// same marks.
pub(crate) fn push_joined(target: &mut Vec<Node>, node: Node) {
    if let Some(last) = target.last_mut() {
        if let (Some(a), Some(b)) = (last.text_str(), node.text_str()) {
            if last.same_markup(&node) {
                let joined = format!("{a}{b}");
                *last = last.with_text(joined);
                return;
            }
        }
    }
    target.push(node);
}
