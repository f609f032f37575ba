//! Wire messages between a session and the document server.
//!
//! Both directions are closed sums tagged by `type`. Field names match the
//! server's JSON.

use quire_doc::{Node, Step};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::participants::ParticipantEntry;

/// Messages a session sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Diff(DiffMessage),
    SelectionChange(SelectionMessage),
    /// Ask the server to confirm our version.
    CheckVersion { v: u64 },
    /// Ask for the whole document again.
    GetDocument,
}

/// Messages the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Presence: one entry per connected session.
    Connections { participant_list: Vec<ParticipantEntry> },
    DocData(DocumentSnapshot),
    /// Answer to `check_version` with the server's version.
    ConfirmVersion { v: u64 },
    SelectionChange(SelectionMessage),
    Diff(DiffMessage),
    ConfirmDiff { rid: u64 },
    RejectDiff { rid: u64 },
    /// The server could not apply our changes.
    PatchError,
}

/// One diff: document steps plus ancillary store updates, applied as a
/// single version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffMessage {
    /// Version the diff is based on.
    pub v: u64,
    /// Request id, per sending session.
    pub rid: u64,
    /// Client id of the author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<u32>,
    /// Document steps as JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ds: Option<Vec<Value>>,
    /// Comment updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cu: Option<Vec<Value>>,
    /// Bibliography updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bu: Option<Vec<Value>>,
    /// Image updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iu: Option<Vec<Value>>,
    /// New document title, when it changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ti: Option<String>,
    /// On a server fix: our pending diff the server dropped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_request_id: Option<u64>,
    /// Sent by the server to bring a lagging client back in line.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub server_fix: bool,
}

impl DiffMessage {
    /// Decode `ds`. Fails on the first step that does not parse.
    pub fn steps(&self) -> Result<Vec<Step>, serde_json::Error> {
        self.ds
            .iter()
            .flatten()
            .map(|json| serde_json::from_value(json.clone()))
            .collect()
    }
}

/// A participant's cursor or selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionMessage {
    /// Participant id.
    pub id: String,
    pub v: u64,
    pub session_id: String,
    pub anchor: usize,
    pub head: usize,
    #[serde(default = "main_editor")]
    pub editor: String,
}

fn main_editor() -> String {
    crate::constants::MAIN_EDITOR.to_owned()
}

/// The full document as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub doc: DocContent,
    pub doc_info: DocInfoMessage,
    /// Server time in milliseconds since the epoch.
    #[serde(default)]
    pub time: i64,
    /// Diffs applied since the version the client last reported, oldest
    /// first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub m: Vec<DiffMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocContent {
    pub content: Node,
    pub v: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocInfoMessage {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// This session is the first writer and the document still needs its
    /// template adjustment.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub template: bool,
}
