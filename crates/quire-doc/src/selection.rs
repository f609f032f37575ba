//! Editor selections and how they move through edits.

use serde::{Deserialize, Serialize};

use crate::mapping::{Bias, Mappable};
use crate::{Node, Walk};

/// A selection in a document. JSON form is tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Selection {
    /// A text range; `anchor` stays put, `head` moves.
    Text { anchor: usize, head: usize },
    /// A single selected node starting at `anchor`.
    Node { anchor: usize },
    /// A rectangular table-cell range between two cell positions.
    Cell { anchor: usize, head: usize },
    /// The whole document.
    All,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::caret(0)
    }
}

impl Selection {
    pub fn caret(pos: usize) -> Self {
        Selection::Text { anchor: pos, head: pos }
    }

    pub fn text(anchor: usize, head: usize) -> Self {
        Selection::Text { anchor, head }
    }

    pub fn anchor(&self) -> usize {
        match *self {
            Selection::Text { anchor, .. }
            | Selection::Node { anchor }
            | Selection::Cell { anchor, .. } => anchor,
            Selection::All => 0,
        }
    }

    /// For `All` this is 0; use [`Selection::to_in`] for the document end.
    pub fn head(&self) -> usize {
        match *self {
            Selection::Text { head, .. } | Selection::Cell { head, .. } => head,
            Selection::Node { anchor } => anchor,
            Selection::All => 0,
        }
    }

    pub fn from(&self) -> usize {
        self.anchor().min(self.head())
    }

    pub fn to(&self) -> usize {
        self.anchor().max(self.head())
    }

    /// End of the selection, resolving `All` and node selections against
    /// `doc`.
    pub fn to_in(&self, doc: &Node) -> usize {
        match self {
            Selection::All => doc.content_size(),
            Selection::Node { anchor } => {
                anchor + doc.node_at(*anchor).map(Node::node_size).unwrap_or(0)
            }
            _ => self.to(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::Text { anchor, head } if anchor == head)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Selection::Text { .. })
    }

    pub fn is_cell(&self) -> bool {
        matches!(self, Selection::Cell { .. })
    }

    /// Carry the selection through `mapping` into `doc`.
    pub fn map(&self, doc: &Node, mapping: &impl Mappable) -> Selection {
        let size = doc.content_size();
        match *self {
            Selection::Text { anchor, head } => {
                let head = mapping.map(head, Bias::After).min(size);
                let anchor = mapping.map(anchor, Bias::After).min(size);
                if is_text_position(doc, head) && is_text_position(doc, anchor) {
                    Selection::Text { anchor, head }
                } else {
                    Selection::near(doc, head)
                }
            }
            Selection::Node { anchor } => {
                let result = mapping.map_result(anchor, Bias::After);
                let pos = result.pos.min(size);
                if result.deleted() || doc.node_at(pos).is_none() {
                    Selection::near(doc, pos)
                } else {
                    Selection::Node { anchor: pos }
                }
            }
            Selection::Cell { anchor, head } => Selection::Cell {
                anchor: mapping.map(anchor, Bias::After).min(size),
                head: mapping.map(head, Bias::After).min(size),
            },
            Selection::All => Selection::All,
        }
    }

    /// A caret at `pos` if it is inside inline content, otherwise the
    /// nearest text position, searching forward first.
    pub fn near(doc: &Node, pos: usize) -> Selection {
        if is_text_position(doc, pos) {
            return Selection::caret(pos);
        }
        Selection::find_from(doc, pos, false)
            .or_else(|| Selection::find_from(doc, pos, true))
            .unwrap_or_else(|| Selection::caret(pos.min(doc.content_size())))
    }

    /// The closest text position in the given direction.
    pub fn find_from(doc: &Node, pos: usize, backward: bool) -> Option<Selection> {
        let mut found: Option<usize> = None;
        doc.descendants(|v| {
            if !v.node.is_textblock() {
                return Walk::Descend;
            }
            let start = v.pos + 1;
            let end = start + v.node.content_size();
            if backward {
                if start <= pos {
                    found = Some(end.min(pos));
                    Walk::Skip
                } else {
                    Walk::Stop
                }
            } else if end >= pos {
                found = Some(start.max(pos));
                Walk::Stop
            } else {
                Walk::Skip
            }
        });
        found.map(Selection::caret)
    }

    /// First text position in the document.
    pub fn at_start(doc: &Node) -> Selection {
        Selection::find_from(doc, 0, false).unwrap_or_default()
    }
}

fn is_text_position(doc: &Node, pos: usize) -> bool {
    doc.resolve(pos).is_ok_and(|r| r.parent().is_textblock())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mapping;
    use crate::build::*;
    use crate::mapping::StepMap;

    fn two_paragraphs() -> Node {
        doc(vec![p(vec![text("One")]), p(vec![text("Two")])])
    }

    #[test]
    fn test_json_shape() {
        let sel = Selection::text(1, 3);
        let json = serde_json::to_value(&sel).unwrap();
        assert_eq!(json, serde_json::json!({"type": "text", "anchor": 1, "head": 3}));
        let back: Selection = serde_json::from_value(json).unwrap();
        assert_eq!(back, sel);
    }

    #[test]
    fn test_map_through_insertion() {
        let d = two_paragraphs();
        let mapping = Mapping::from_maps(vec![StepMap::new([(1, 0, 2)])]);
        let moved = Selection::caret(2).map(&d, &mapping);
        assert_eq!(moved, Selection::caret(4));
    }

    #[test]
    fn test_near_finds_text_position() {
        let d = two_paragraphs();
        assert_eq!(Selection::near(&d, 5), Selection::caret(6));
        assert_eq!(Selection::near(&d, 10), Selection::caret(9));
        assert_eq!(Selection::find_from(&d, 5, true), Some(Selection::caret(4)));
        assert_eq!(Selection::at_start(&d), Selection::caret(1));
    }

    #[test]
    fn test_from_to_order() {
        let sel = Selection::text(5, 2);
        assert_eq!((sel.from(), sel.to()), (2, 5));
        assert!(!sel.is_empty());
    }
}
