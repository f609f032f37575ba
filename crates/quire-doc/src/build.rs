//! Short constructors for building documents by hand, mostly in tests.
//!
//! ```
//! use quire_doc::build::*;
//!
//! let d = doc(vec![h(1, vec![text("Title")]), p(vec![text("Body")])]);
//! assert_eq!(d.content_size(), 13);
//! ```

use serde_json::json;

use crate::{Attrs, Fragment, Mark, Node, NodeType};

/// A node of `node_type` with default attributes and the given children.
pub fn node(node_type: NodeType, children: Vec<Node>) -> Node {
    Node::new(node_type, Attrs::new(), Fragment::from_nodes(children), Vec::new())
}

pub fn doc(children: Vec<Node>) -> Node {
    node(NodeType::Doc, children)
}

pub fn p(children: Vec<Node>) -> Node {
    node(NodeType::Paragraph, children)
}

pub fn h(level: u64, children: Vec<Node>) -> Node {
    let mut attrs = Attrs::new();
    attrs.insert("level".into(), json!(level));
    Node::new(NodeType::Heading, attrs, Fragment::from_nodes(children), Vec::new())
}

pub fn blockquote(children: Vec<Node>) -> Node {
    node(NodeType::Blockquote, children)
}

pub fn code_block(children: Vec<Node>) -> Node {
    node(NodeType::CodeBlock, children)
}

pub fn ul(items: Vec<Node>) -> Node {
    node(NodeType::BulletList, items)
}

pub fn ol(items: Vec<Node>) -> Node {
    node(NodeType::OrderedList, items)
}

pub fn li(children: Vec<Node>) -> Node {
    node(NodeType::ListItem, children)
}

pub fn figure(children: Vec<Node>) -> Node {
    node(NodeType::Figure, children)
}

pub fn table(rows: Vec<Node>) -> Node {
    node(NodeType::Table, rows)
}

pub fn table_row(cells: Vec<Node>) -> Node {
    node(NodeType::TableRow, cells)
}

pub fn table_cell(children: Vec<Node>) -> Node {
    node(NodeType::TableCell, children)
}

pub fn hard_break() -> Node {
    node(NodeType::HardBreak, Vec::new())
}

pub fn text(s: &str) -> Node {
    Node::text(s, Vec::new())
}

pub fn marked(s: &str, marks: Vec<Mark>) -> Node {
    Node::text(s, marks)
}
