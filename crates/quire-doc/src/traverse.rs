//! Depth-first traversal with pruning.

use std::ops::ControlFlow;

use crate::{Fragment, Node};

/// What a visitor wants after seeing a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Visit the node's children.
    Descend,
    /// Skip the node's children, continue with its next sibling.
    Skip,
    /// End the traversal.
    Stop,
}

/// A node visited by [`Node::nodes_between`].
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub node: &'a Node,
    /// Absolute position of the node's start.
    pub pos: usize,
    pub parent: &'a Node,
    /// Index of the node in its parent.
    pub index: usize,
}

impl Node {
    /// Visit every node overlapping `from..to`, in document order.
    pub fn nodes_between<F>(&self, from: usize, to: usize, mut visit: F)
    where
        F: FnMut(Visit<'_>) -> Walk,
    {
        let _ = walk_fragment(self.content(), self, from, to, 0, &mut visit);
    }

    /// Visit every descendant.
    pub fn descendants<F>(&self, visit: F)
    where
        F: FnMut(Visit<'_>) -> Walk,
    {
        self.nodes_between(0, self.content_size(), visit)
    }
}

fn walk_fragment<F>(
    fragment: &Fragment,
    parent: &Node,
    from: usize,
    to: usize,
    node_start: usize,
    visit: &mut F,
) -> ControlFlow<()>
where
    F: FnMut(Visit<'_>) -> Walk,
{
    let mut pos = 0;
    for (index, child) in fragment.iter().enumerate() {
        if pos >= to {
            break;
        }
        let end = pos + child.node_size();
        if end > from {
            match visit(Visit { node: child, pos: node_start + pos, parent, index }) {
                Walk::Stop => return ControlFlow::Break(()),
                Walk::Skip => {}
                Walk::Descend if child.content_size() > 0 => {
                    let start = pos + 1;
                    walk_fragment(
                        child.content(),
                        child,
                        from.saturating_sub(start),
                        child.content_size().min(to.saturating_sub(start)),
                        node_start + start,
                        visit,
                    )?;
                }
                Walk::Descend => {}
            }
        }
        pos = end;
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use crate::build::*;
    use crate::{NodeType, Walk};

    fn sample() -> crate::Node {
        doc(vec![
            p(vec![text("One")]),
            blockquote(vec![p(vec![text("Two")])]),
            p(vec![text("Three")]),
        ])
    }

    #[test]
    fn test_visits_in_document_order() {
        let d = sample();
        let mut seen = Vec::new();
        d.nodes_between(2, 9, |v| {
            seen.push((v.node.node_type(), v.pos));
            Walk::Descend
        });
        assert_eq!(
            seen,
            vec![
                (NodeType::Paragraph, 0),
                (NodeType::Text, 1),
                (NodeType::Blockquote, 5),
                (NodeType::Paragraph, 6),
                (NodeType::Text, 7),
            ]
        );
    }

    #[test]
    fn test_skip_prunes_children() {
        let d = sample();
        let mut seen = Vec::new();
        d.descendants(|v| {
            seen.push(v.node.node_type());
            if v.node.node_type() == NodeType::Blockquote { Walk::Skip } else { Walk::Descend }
        });
        assert_eq!(seen.iter().filter(|t| **t == NodeType::Paragraph).count(), 2);
    }

    #[test]
    fn test_stop_ends_walk() {
        let d = sample();
        let mut count = 0;
        d.descendants(|_| {
            count += 1;
            if count == 3 { Walk::Stop } else { Walk::Descend }
        });
        assert_eq!(count, 3);
    }
}
