//! Document slices: a fragment with open ends.

use serde::{Deserialize, Serialize};

use crate::{Fragment, ModelError, Node, NodeType};

/// A piece of document cut out of its context. `open_start` and `open_end`
/// count how many nodes on each side are cut open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SliceJson", into = "SliceJson")]
pub struct Slice {
    content: Fragment,
    open_start: usize,
    open_end: usize,
}

impl Slice {
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Self {
        Self { content, open_start, open_end }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Closed slice of the given nodes.
    pub fn closed(nodes: impl IntoIterator<Item = Node>) -> Self {
        Self::new(Fragment::from_nodes(nodes), 0, 0)
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn open_start(&self) -> usize {
        self.open_start
    }

    pub fn open_end(&self) -> usize {
        self.open_end
    }

    /// Size the slice adds when inserted.
    pub fn size(&self) -> usize {
        self.content.size().saturating_sub(self.open_start + self.open_end)
    }

    pub fn is_empty(&self) -> bool {
        self.content.size() == 0
    }

    /// Insert `fragment` at `pos` (relative to the slice), or `None` if the
    /// node at that position does not accept it.
    pub fn insert_at(&self, pos: usize, fragment: &Fragment) -> Option<Slice> {
        let content = insert_into(&self.content, pos + self.open_start, fragment, None)?;
        Some(Slice::new(content, self.open_start, self.open_end))
    }

    /// Remove the flat range `from..to` (relative to the slice).
    pub fn remove_between(&self, from: usize, to: usize) -> Result<Slice, ModelError> {
        let content = remove_range(&self.content, from + self.open_start, to + self.open_start)?;
        Ok(Slice::new(content, self.open_start, self.open_end))
    }
}

fn remove_range(content: &Fragment, from: usize, to: usize) -> Result<Fragment, ModelError> {
    let (index, offset) = content.find_index(from)?;
    let (index_to, offset_to) = content.find_index(to)?;
    match content.maybe_child(index) {
        Some(child) if offset != from && !child.is_text() => {
            if index != index_to {
                return Err(ModelError::NonFlatRange);
            }
            let inner = remove_range(child.content(), from - offset - 1, to - offset - 1)?;
            Ok(content.replace_child(index, child.copy(inner)))
        }
        _ => {
            if offset_to != to && !content.maybe_child(index_to).is_some_and(Node::is_text) {
                return Err(ModelError::NonFlatRange);
            }
            Ok(content.cut(0, from).append(&content.cut(to, content.size())))
        }
    }
}

fn insert_into(
    content: &Fragment,
    dist: usize,
    insert: &Fragment,
    parent: Option<NodeType>,
) -> Option<Fragment> {
    let (index, offset) = content.find_index(dist).ok()?;
    match content.maybe_child(index) {
        Some(child) if offset != dist && !child.is_text() => {
            let inner = insert_into(child.content(), dist - offset - 1, insert, Some(child.node_type()))?;
            Some(content.replace_child(index, child.copy(inner)))
        }
        _ => {
            if let Some(parent) = parent {
                if !insert.iter().all(|n| parent.accepts(n.node_type())) {
                    return None;
                }
            }
            Some(content.cut(0, dist).append(insert).append(&content.cut(dist, content.size())))
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SliceJson {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<Node>,
    #[serde(default, skip_serializing_if = "is_zero")]
    open_start: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    open_end: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl From<SliceJson> for Slice {
    fn from(json: SliceJson) -> Self {
        Slice::new(Fragment::from_nodes(json.content), json.open_start, json.open_end)
    }
}

impl From<Slice> for SliceJson {
    fn from(slice: Slice) -> Self {
        SliceJson {
            content: slice.content.into_nodes(),
            open_start: slice.open_start,
            open_end: slice.open_end,
        }
    }
}
