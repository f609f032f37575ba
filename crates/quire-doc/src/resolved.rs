//! Positions resolved against a document tree.

use crate::{ModelError, Node};

#[derive(Debug, Clone, Copy)]
struct PathEntry<'a> {
    node: &'a Node,
    /// Index of the child the position points into (or before).
    index: usize,
    /// Absolute position of the start of that child.
    start: usize,
}

/// A position with the path of ancestors leading to it.
///
/// Depth 0 is the top node. `node(depth())` is the innermost node whose
/// content contains the position.
#[derive(Debug, Clone)]
pub struct ResolvedPos<'a> {
    pos: usize,
    path: Vec<PathEntry<'a>>,
    parent_offset: usize,
}

impl<'a> ResolvedPos<'a> {
    pub(crate) fn resolve(doc: &'a Node, pos: usize) -> Result<Self, ModelError> {
        if pos > doc.content_size() {
            return Err(ModelError::PositionOutOfRange { pos, size: doc.content_size() });
        }
        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc;
        loop {
            let (index, offset) = node.content().find_index(parent_offset)?;
            let rem = parent_offset - offset;
            path.push(PathEntry { node, index, start: start + offset });
            if rem == 0 {
                break;
            }
            let child = node.child(index);
            if child.is_text() {
                break;
            }
            node = child;
            parent_offset = rem - 1;
            start += offset + 1;
        }
        Ok(Self { pos, path, parent_offset })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// Offset of the position inside its parent node.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    pub fn node(&self, depth: usize) -> &'a Node {
        self.path[depth].node
    }

    pub fn parent(&self) -> &'a Node {
        self.node(self.depth())
    }

    pub fn doc(&self) -> &'a Node {
        self.node(0)
    }

    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    pub fn index_after(&self, depth: usize) -> usize {
        let bump = if depth == self.depth() && self.text_offset() == 0 { 0 } else { 1 };
        self.index(depth) + bump
    }

    /// Start of the content of the node at `depth`.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 { 0 } else { self.path[depth - 1].start + 1 }
    }

    /// End of the content of the node at `depth`.
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Position directly before the node at `depth` (depth > 0).
    pub fn before(&self, depth: usize) -> usize {
        if depth == self.depth() + 1 { self.pos } else { self.path[depth - 1].start }
    }

    /// Position directly after the node at `depth` (depth > 0).
    pub fn after(&self, depth: usize) -> usize {
        if depth == self.depth() + 1 {
            self.pos
        } else {
            self.path[depth - 1].start + self.node(depth).node_size()
        }
    }

    /// Offset into a text node when the position points inside one.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].start
    }

    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let child = parent.maybe_child(index)?;
        let off = self.text_offset();
        Some(if off > 0 { child.cut(off, child.node_size()) } else { child.clone() })
    }

    pub fn node_before(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let off = self.text_offset();
        if off > 0 {
            return Some(parent.child(index).cut(0, off));
        }
        if index == 0 { None } else { Some(parent.child(index - 1).clone()) }
    }

    /// Deepest depth whose node contains both this position and `pos`.
    pub fn shared_depth(&self, pos: usize) -> usize {
        (1..=self.depth())
            .rev()
            .find(|&d| self.start(d) <= pos && self.end(d) >= pos)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use crate::build::*;

    #[test]
    fn test_resolve_depths() {
        let d = doc(vec![p(vec![text("One")]), blockquote(vec![p(vec![text("Two")])])]);
        let r = d.resolve(2).unwrap();
        assert_eq!(r.depth(), 1);
        assert_eq!(r.parent_offset(), 1);
        assert_eq!(r.start(1), 1);
        assert_eq!(r.end(1), 4);
        assert_eq!(r.text_offset(), 1);
        assert_eq!(r.node_after().and_then(|n| n.text_str().map(str::to_owned)), Some("ne".into()));

        let r = d.resolve(7).unwrap();
        assert_eq!(r.depth(), 2);
        assert_eq!(r.before(2), 6);
        assert_eq!(r.after(1), 12);
        assert_eq!(r.shared_depth(9), 2);
        assert_eq!(r.shared_depth(2), 0);
    }

    #[test]
    fn test_resolve_out_of_range() {
        let d = doc(vec![p(vec![text("One")])]);
        assert!(d.resolve(5).is_ok());
        assert!(d.resolve(6).is_err());
    }
}
