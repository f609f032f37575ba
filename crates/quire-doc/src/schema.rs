//! Node types of the editor schema.
//!
//! The schema is fixed: every node type knows whether it is inline or block,
//! what kind of children it accepts and which attributes it carries by
//! default. Block types that can be reviewed carry a `track` attribute.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use strum::{AsRefStr, Display, EnumString};

/// Node attributes as stored in the document JSON.
pub type Attrs = Map<String, Value>;

/// Name of the node attribute holding track annotations.
pub const TRACK_ATTR: &str = "track";

/// All node types known to the schema.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeType {
    Doc,
    Paragraph,
    Heading,
    Blockquote,
    CodeBlock,
    #[serde(rename = "bulletList")]
    #[strum(serialize = "bulletList")]
    BulletList,
    #[serde(rename = "orderedList")]
    #[strum(serialize = "orderedList")]
    OrderedList,
    #[serde(rename = "listItem")]
    #[strum(serialize = "listItem")]
    ListItem,
    Figure,
    Image,
    Table,
    TableRow,
    TableCell,
    HardBreak,
    Text,
}

/// What a node type accepts as children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Leaf node, no children.
    Empty,
    /// Text and inline leaves.
    Inline,
    /// Top-level style blocks (paragraphs, lists, tables...).
    Blocks,
    /// List items only.
    ListItems,
    /// Table rows only.
    Rows,
    /// Table cells only.
    Cells,
}

impl NodeType {
    pub fn is_text(self) -> bool {
        self == NodeType::Text
    }

    pub fn is_inline(self) -> bool {
        matches!(self, NodeType::Text | NodeType::Image | NodeType::HardBreak)
    }

    pub fn is_block(self) -> bool {
        !self.is_inline()
    }

    pub fn is_leaf(self) -> bool {
        self.content_kind() == ContentKind::Empty
    }

    /// Block whose content is inline.
    pub fn is_textblock(self) -> bool {
        self.content_kind() == ContentKind::Inline
    }

    pub fn is_list(self) -> bool {
        matches!(self, NodeType::BulletList | NodeType::OrderedList)
    }

    /// Whether nodes of this type carry a `track` attribute.
    pub fn is_tracked(self) -> bool {
        matches!(
            self,
            NodeType::Paragraph
                | NodeType::Heading
                | NodeType::Blockquote
                | NodeType::CodeBlock
                | NodeType::BulletList
                | NodeType::OrderedList
                | NodeType::ListItem
                | NodeType::Figure
                | NodeType::Table
        )
    }

    pub fn content_kind(self) -> ContentKind {
        match self {
            NodeType::Text | NodeType::Image | NodeType::HardBreak => ContentKind::Empty,
            NodeType::Paragraph | NodeType::Heading | NodeType::CodeBlock => ContentKind::Inline,
            NodeType::Doc
            | NodeType::Blockquote
            | NodeType::ListItem
            | NodeType::Figure
            | NodeType::TableCell => ContentKind::Blocks,
            NodeType::BulletList | NodeType::OrderedList => ContentKind::ListItems,
            NodeType::Table => ContentKind::Rows,
            NodeType::TableRow => ContentKind::Cells,
        }
    }

    /// Whether a node of `child` type may appear directly inside this one.
    pub fn accepts(self, child: NodeType) -> bool {
        match self.content_kind() {
            ContentKind::Empty => false,
            ContentKind::Inline => child.is_inline(),
            ContentKind::Blocks => {
                child.is_block()
                    && !matches!(
                        child,
                        NodeType::Doc | NodeType::ListItem | NodeType::TableRow | NodeType::TableCell
                    )
            }
            ContentKind::ListItems => child == NodeType::ListItem,
            ContentKind::Rows => child == NodeType::TableRow,
            ContentKind::Cells => child == NodeType::TableCell,
        }
    }

    /// Whether content of one type can be joined onto the other.
    pub fn compatible_content(self, other: NodeType) -> bool {
        self == other || self.content_kind() == other.content_kind()
    }

    /// Whether inline children of this node may carry marks.
    pub fn allows_marks(self) -> bool {
        self != NodeType::CodeBlock
    }

    /// Attributes every node of this type starts with.
    pub fn default_attrs(self) -> Attrs {
        let mut attrs = Attrs::new();
        match self {
            NodeType::Heading => {
                attrs.insert("level".into(), json!(1));
            }
            NodeType::OrderedList => {
                attrs.insert("order".into(), json!(1));
            }
            NodeType::Image => {
                attrs.insert("src".into(), Value::String(String::new()));
            }
            _ => {}
        }
        if self.is_tracked() {
            attrs.insert(TRACK_ATTR.into(), Value::Array(Vec::new()));
        }
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_names_match_wire_format() {
        assert_eq!(NodeType::BulletList.to_string(), "bulletList");
        assert_eq!(NodeType::TableCell.to_string(), "table_cell");
        assert_eq!(NodeType::from_str("listItem").unwrap(), NodeType::ListItem);
        assert_eq!(
            serde_json::to_string(&NodeType::CodeBlock).unwrap(),
            "\"code_block\""
        );
    }

    #[test]
    fn test_content_rules() {
        assert!(NodeType::Paragraph.accepts(NodeType::Text));
        assert!(!NodeType::Paragraph.accepts(NodeType::Paragraph));
        assert!(NodeType::Doc.accepts(NodeType::BulletList));
        assert!(!NodeType::Doc.accepts(NodeType::ListItem));
        assert!(NodeType::BulletList.accepts(NodeType::ListItem));
        assert!(NodeType::Paragraph.compatible_content(NodeType::Heading));
        assert!(!NodeType::Paragraph.compatible_content(NodeType::Blockquote));
    }

    #[test]
    fn test_default_attrs() {
        let attrs = NodeType::Heading.default_attrs();
        assert_eq!(attrs.get("level"), Some(&json!(1)));
        assert_eq!(attrs.get(TRACK_ATTR), Some(&json!([])));
        assert!(NodeType::TableRow.default_attrs().is_empty());
    }
}
