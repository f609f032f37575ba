//! Block-level track annotations stored in the `track` node attribute.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Attrs, NodeType};

/// Category of a block annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Insertion,
    Deletion,
    FormatChange,
    BlockChange,
}

/// Node type and attributes of a block before a `block_change`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub attrs: Attrs,
}

/// One entry of a block's `track` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackAttr {
    #[serde(rename = "type")]
    pub kind: TrackKind,
    pub user: String,
    pub username: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<BlockState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<BlockState>,
}

impl TrackAttr {
    pub fn new(kind: TrackKind, user: &str, username: &str, date: DateTime<Utc>) -> Self {
        Self {
            kind,
            user: user.to_owned(),
            username: username.to_owned(),
            date,
            approved: None,
            before: None,
            after: None,
        }
    }

    pub fn with_before(mut self, before: BlockState) -> Self {
        self.before = Some(before);
        self
    }
}
