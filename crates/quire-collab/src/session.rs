//! Per-document synchronization with the server.
//!
//! The session keeps the server-confirmed version and document, sends local
//! steps as diffs one at a time, and merges diffs from collaborators by
//! rebasing unconfirmed local steps over them.
//!
//! # States
//!
//! ```text
//!            send_to_collaborators()           confirm_diff / reject_diff
//!   Idle ───────────────────────────▶ Awaiting ─────────────────────────▶ Idle
//!                                       │ diff watchdog
//!                                       ▼
//!                              CheckingVersion ── confirm_version (match) ──▶ Idle
//! ```
//!
//! Nothing here fails on bad input from the network: a diff that does not
//! fit leads to a version check, and the server answers with a fix or the
//! whole document.
//!
//! The session does no I/O and reads time only through its [`Clock`]; call
//! [`poll_timers`](DocSyncSession::poll_timers) at
//! [`next_deadline`](DocSyncSession::next_deadline). The
//! [`driver`](crate::driver) does both on a tokio task.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use quire_doc::{
    CollabState, EditorState, MarkType, MetaKey, Node, Selection, Step, Transaction,
    discard_unconfirmed, receive_transaction, sendable_steps,
};
use quire_track::amend_transaction;
use serde_json::{Value, json};
use tracing::{debug, info, trace, warn};

use crate::capabilities::{Capabilities, EditorView};
use crate::constants::MAIN_EDITOR;
use crate::messages::{
    ClientMessage, DiffMessage, DocumentSnapshot, SelectionMessage, ServerMessage,
};
use crate::participants::{ParticipantEntry, ParticipantRegistry, PresenceChange};
use crate::timer::Watchdog;
use crate::SyncConfig;

/// What the session knows about its document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocInfo {
    pub id: String,
    /// Diffs applied so far, local and remote.
    pub version: u64,
    /// The document as confirmed by the server. Never includes unconfirmed
    /// local steps. `None` until loaded.
    pub confirmed_doc: Option<Node>,
    pub session_id: Option<String>,
    /// Identifies our steps in diffs echoed back by the server.
    pub client_id: u32,
    /// Last load or local change.
    pub updated: Option<DateTime<Utc>>,
    /// Local clock minus server clock at load, in milliseconds.
    pub clock_skew_ms: i64,
}

/// A diff sent and not yet answered.
#[derive(Debug, Clone, PartialEq)]
pub struct UnconfirmedDiff {
    pub rid: u64,
    pub base_version: u64,
    pub steps: Vec<Step>,
    pub comment_updates: Vec<Value>,
    pub bibliography_updates: Vec<Value>,
    pub image_updates: Vec<Value>,
    pub title: Option<String>,
    /// The local document when the diff was sent, sent steps included.
    pub doc: Node,
}

/// How far loading has got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    WaitingForDocument,
    /// Loaded from a template; sending waits for the adjustment steps.
    AdjustingTemplate,
    Ready,
}

/// Keeps one open document in sync with the server and its collaborators.
pub struct DocSyncSession {
    caps: Capabilities,
    config: SyncConfig,
    info: DocInfo,
    phase: LoadPhase,
    unconfirmed: BTreeMap<u64, UnconfirmedDiff>,
    next_rid: u64,
    awaiting_diff_response: bool,
    checking_version: bool,
    /// Reconnected; check the version once presence arrives.
    resubscribed: bool,
    last_selection: Option<Selection>,
    participants: ParticipantRegistry,
    /// Unanswered diff.
    diff_watchdog: Watchdog,
    /// Unanswered version check.
    version_watchdog: Watchdog,
    /// Debounce before sending again after a server fix.
    resend_watchdog: Watchdog,
}

impl DocSyncSession {
    /// A session for document `doc_id` with a random client id.
    pub fn new(doc_id: impl Into<String>, caps: Capabilities, config: SyncConfig) -> Self {
        Self::with_client_id(doc_id, caps, config, rand::random())
    }

    pub fn with_client_id(
        doc_id: impl Into<String>,
        caps: Capabilities,
        config: SyncConfig,
        client_id: u32,
    ) -> Self {
        Self {
            caps,
            config,
            info: DocInfo {
                id: doc_id.into(),
                version: 0,
                confirmed_doc: None,
                session_id: None,
                client_id,
                updated: None,
                clock_skew_ms: 0,
            },
            phase: LoadPhase::WaitingForDocument,
            unconfirmed: BTreeMap::new(),
            next_rid: 0,
            awaiting_diff_response: false,
            checking_version: false,
            resubscribed: false,
            last_selection: None,
            participants: ParticipantRegistry::new(),
            diff_watchdog: Watchdog::new("diff"),
            version_watchdog: Watchdog::new("version"),
            resend_watchdog: Watchdog::new("server_fix"),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn version(&self) -> u64 {
        self.info.version
    }

    pub fn doc_info(&self) -> &DocInfo {
        &self.info
    }

    pub fn client_id(&self) -> u32 {
        self.info.client_id
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn view(&self) -> &dyn EditorView {
        self.caps.view.as_ref()
    }

    pub fn state(&self) -> &EditorState {
        self.caps.view.state()
    }

    pub fn pending_diffs(&self) -> impl Iterator<Item = &UnconfirmedDiff> {
        self.unconfirmed.values()
    }

    pub fn is_awaiting_diff_response(&self) -> bool {
        self.awaiting_diff_response
    }

    pub fn is_checking_version(&self) -> bool {
        self.checking_version
    }

    pub fn participants(&self) -> &ParticipantRegistry {
        &self.participants
    }

    // ── Loading ──────────────────────────────────────────────────────────

    /// Start over from `snapshot`: pending diffs are dropped and the editor
    /// gets a fresh state.
    pub fn load_document(&mut self, snapshot: DocumentSnapshot) {
        let DocumentSnapshot { doc, doc_info, time, .. } = snapshot;
        self.unconfirmed.clear();
        self.diff_watchdog.cancel();
        self.resend_watchdog.cancel();
        self.awaiting_diff_response = false;
        self.last_selection = None;

        let now = self.caps.clock.utc();
        self.info.id = doc_info.id;
        if doc_info.session_id.is_some() {
            self.info.session_id = doc_info.session_id;
        }
        self.info.version = doc.v;
        self.info.updated = Some(now);
        self.info.clock_skew_ms = if time > 0 { now.timestamp_millis() - time } else { 0 };

        let state = EditorState::new(doc.content.clone(), CollabState::new(doc.v, self.info.client_id));
        self.caps.view.set_state(state);
        self.info.confirmed_doc = Some(doc.content);
        self.phase = if doc_info.template {
            LoadPhase::AdjustingTemplate
        } else {
            LoadPhase::Ready
        };
        info!(doc = %self.info.id, version = self.info.version, phase = ?self.phase, "document loaded");
    }

    /// The server sent the whole document, on open or because we asked.
    ///
    /// With local steps still unconfirmed, the diffs we missed are replayed
    /// under them so they survive; the document is reloaded only when that
    /// does not reproduce the server's copy.
    pub fn receive_document(&mut self, snapshot: DocumentSnapshot) {
        self.cancel_checking_version();
        if self.info.confirmed_doc.is_some() {
            if self.merge_missed_diffs(&snapshot) {
                return;
            }
            info!(
                local = self.info.version,
                server = snapshot.doc.v,
                dropped = self.unconfirmed.len(),
                "reloading document from server"
            );
        }
        self.load_document(snapshot);
    }

    /// Rebase unconfirmed local steps over the diffs in `snapshot.m`.
    /// Returns false, changing nothing, if that cannot be done.
    fn merge_missed_diffs(&mut self, snapshot: &DocumentSnapshot) -> bool {
        if self.phase != LoadPhase::Ready || snapshot.doc.v <= self.info.version || snapshot.m.is_empty() {
            return false;
        }
        let Some(local) = sendable_steps(self.caps.view.state()) else {
            return false;
        };

        let mut steps = Vec::new();
        for diff in snapshot.m.iter().filter(|diff| diff.cid != Some(self.info.client_id)) {
            match diff.steps() {
                Ok(decoded) => steps.extend(decoded),
                Err(e) => {
                    debug!(rid = diff.rid, "missed diff undecodable: {}", e);
                    return false;
                }
            }
        }
        let authors = vec![self.info.client_id.wrapping_add(1); steps.len()];
        let mut tr = match receive_transaction(self.caps.view.state(), &steps, &authors) {
            Ok(tr) => tr,
            Err(e) => {
                debug!("missed diffs do not apply: {}", e);
                return false;
            }
        };
        let confirmed = if steps.is_empty() {
            self.info.confirmed_doc.clone()
        } else {
            Some(confirmed_doc_after(&tr, steps.len()))
        };
        if confirmed.as_ref() != Some(&snapshot.doc.content) {
            debug!(server = snapshot.doc.v, "missed diffs do not reproduce server document");
            return false;
        }

        tr.set_meta(MetaKey::Remote, json!(true));
        self.caps.view.dispatch(tr);
        info!(
            local = self.info.version,
            server = snapshot.doc.v,
            missed = snapshot.m.len(),
            kept = local.steps.len(),
            "merged missed diffs under local changes"
        );
        self.info.version = snapshot.doc.v;
        self.info.confirmed_doc = confirmed;
        if snapshot.doc_info.session_id.is_some() {
            self.info.session_id = snapshot.doc_info.session_id.clone();
        }
        // The server is past every pending diff's base without having
        // applied it; the steps go out again on the new version.
        self.unconfirmed.clear();
        self.diff_watchdog.cancel();
        self.resend_watchdog.cancel();
        self.awaiting_diff_response = false;
        self.send_to_collaborators();
        true
    }

    /// Apply the template adjustment for a freshly created document and
    /// start sending.
    pub fn finish_template_adjustment(&mut self, steps: &[Step]) {
        if self.phase != LoadPhase::AdjustingTemplate {
            debug!(phase = ?self.phase, "no template adjustment pending");
            return;
        }
        let mut tr = self.caps.view.state().tr();
        for step in steps {
            if let Err(e) = tr.step(step.clone()) {
                debug!("template step dropped: {}", e);
            }
        }
        // Not the user's edit: keep it out of change tracking.
        tr.set_meta(MetaKey::Remote, json!(true));
        if tr.doc_changed() {
            self.caps.view.dispatch(tr);
        }
        self.phase = LoadPhase::Ready;
        self.send_to_collaborators();
    }

    // ── Local edits ──────────────────────────────────────────────────────

    /// Dispatch a transaction from the editor: tracked changes are applied,
    /// then the result is sent if nothing is in flight.
    pub fn dispatch_local(&mut self, tr: Transaction) {
        let user = self.caps.identity.user();
        let now = self.caps.clock.utc();
        let tr = amend_transaction(tr, self.caps.view.state(), &user, self.config.track_changes, now);
        if tr.doc_changed() {
            self.info.updated = Some(now);
        }
        self.caps.view.dispatch(tr);
        self.send_to_collaborators();
    }

    /// Send pending local changes as one diff, or else the selection if it
    /// moved. Does nothing while a diff is in flight or the document is not
    /// ready.
    pub fn send_to_collaborators(&mut self) {
        if self.awaiting_diff_response || self.phase != LoadPhase::Ready || self.resend_watchdog.is_armed() {
            trace!(
                awaiting = self.awaiting_diff_response,
                phase = ?self.phase,
                "send deferred"
            );
            return;
        }
        let steps = sendable_steps(self.caps.view.state()).map(|s| s.steps).unwrap_or_default();
        let comments = self.caps.comments.unsent_events();
        let bibliography = self.caps.bibliography.unsent_events();
        let images = self.caps.images.unsent_events();
        if steps.is_empty() && comments.is_empty() && bibliography.is_empty() && images.is_empty() {
            self.send_selection();
        } else {
            self.send_diff(steps, comments, bibliography, images);
        }
    }

    fn send_diff(&mut self, steps: Vec<Step>, comments: Vec<Value>, bibliography: Vec<Value>, images: Vec<Value>) {
        self.disable_diff_sending();
        let rid = self.next_rid;
        self.next_rid += 1;
        let doc = self.caps.view.state().doc().clone();

        let (ds, title) = if steps.is_empty() {
            (None, None)
        } else {
            let ds: Vec<Value> = steps
                .iter()
                .filter_map(|step| match serde_json::to_value(step) {
                    Ok(json) => Some(json),
                    Err(e) => {
                        warn!(rid, "step not serializable, left out of diff: {}", e);
                        None
                    }
                })
                .collect();
            (Some(ds), self.title_change(&doc))
        };
        let non_empty = |events: &[Value]| (!events.is_empty()).then(|| events.to_vec());
        let message = DiffMessage {
            v: self.info.version,
            rid,
            cid: Some(self.info.client_id),
            ds,
            cu: non_empty(&comments),
            bu: non_empty(&bibliography),
            iu: non_empty(&images),
            ti: title.clone(),
            ..Default::default()
        };
        debug!(rid, version = self.info.version, steps = steps.len(), "sending diff");

        self.unconfirmed.insert(
            rid,
            UnconfirmedDiff {
                rid,
                base_version: self.info.version,
                steps,
                comment_updates: comments,
                bibliography_updates: bibliography,
                image_updates: images,
                title,
                doc,
            },
        );
        self.caps.transport.send(ClientMessage::Diff(message));
    }

    /// The new title if the document's differs from the confirmed one.
    fn title_change(&self, doc: &Node) -> Option<String> {
        let max = self.config.title_max_chars;
        let new = document_title(doc, max);
        let old = self
            .info
            .confirmed_doc
            .as_ref()
            .map(|confirmed| document_title(confirmed, max))
            .unwrap_or_default();
        (new != old).then_some(new)
    }

    fn send_selection(&mut self) {
        let selection = self.caps.view.state().selection().clone();
        if self.last_selection.as_ref() == Some(&selection) {
            return;
        }
        let message = SelectionMessage {
            id: self.caps.identity.user().id,
            v: self.info.version,
            session_id: self.info.session_id.clone().unwrap_or_default(),
            anchor: selection.anchor(),
            head: selection.head(),
            editor: MAIN_EDITOR.to_owned(),
        };
        self.last_selection = Some(selection);
        self.caps.transport.send(ClientMessage::SelectionChange(message));
    }

    /// Hold further diffs until the current one is answered, checking the
    /// version if no answer comes in time.
    pub fn disable_diff_sending(&mut self) {
        self.awaiting_diff_response = true;
        let now = self.caps.clock.now();
        self.diff_watchdog.arm(now, self.config.diff_ack_timeout());
    }

    pub fn enable_diff_sending(&mut self) {
        self.diff_watchdog.cancel();
        self.awaiting_diff_response = false;
        self.send_to_collaborators();
    }

    /// Ask the server to confirm our version. At most one check is out at a
    /// time; none before the document is loaded.
    pub fn check_version(&mut self) {
        if self.checking_version || self.info.confirmed_doc.is_none() {
            trace!(checking = self.checking_version, "version check skipped");
            return;
        }
        self.checking_version = true;
        let now = self.caps.clock.now();
        self.version_watchdog.arm(now, self.config.version_check_timeout());
        if self.caps.transport.is_connected() {
            self.disable_diff_sending();
        }
        debug!(version = self.info.version, "checking version");
        self.caps.transport.send(ClientMessage::CheckVersion { v: self.info.version });
    }

    pub fn cancel_checking_version(&mut self) {
        self.checking_version = false;
        self.version_watchdog.cancel();
    }

    /// The connection was re-established. Diffs wait until the version is
    /// confirmed.
    pub fn resubscribed(&mut self) {
        self.resubscribed = true;
        self.disable_diff_sending();
    }

    // ── Server answers ───────────────────────────────────────────────────

    /// The server applied our diff `rid`.
    pub fn confirm_diff(&mut self, rid: u64) {
        let Some(diff) = self.unconfirmed.remove(&rid) else {
            debug!(rid, "confirmation for unknown diff");
            return;
        };
        self.info.version += 1;
        if !diff.steps.is_empty() {
            let ours = vec![self.info.client_id; diff.steps.len()];
            match receive_transaction(self.caps.view.state(), &diff.steps, &ours) {
                Ok(tr) => self.caps.view.dispatch(tr),
                Err(e) => warn!(rid, "confirmed steps could not be applied: {}", e),
            }
            // Remote diffs may have landed since sending, so `diff.doc` is
            // only the fallback.
            let confirmed = without_unconfirmed(self.caps.view.state()).unwrap_or(diff.doc);
            self.info.confirmed_doc = Some(confirmed);
        }
        self.caps.comments.events_sent(&diff.comment_updates);
        self.caps.bibliography.events_sent(&diff.bibliography_updates);
        self.caps.images.events_sent(&diff.image_updates);
        debug!(rid, version = self.info.version, "diff confirmed");
        self.enable_diff_sending();
    }

    /// The server refused our diff `rid`; its steps are taken back.
    pub fn reject_diff(&mut self, rid: u64) {
        match self.unconfirmed.remove(&rid) {
            Some(diff) => {
                warn!(rid, steps = diff.steps.len(), "diff rejected by server");
                self.discard_steps(&diff);
            }
            None => debug!(rid, "rejection for unknown diff"),
        }
        self.enable_diff_sending();
    }

    /// Undo `diff`'s steps, which lead the editor's unconfirmed steps.
    fn discard_steps(&mut self, diff: &UnconfirmedDiff) {
        if diff.steps.is_empty() {
            return;
        }
        match discard_unconfirmed(self.caps.view.state(), diff.steps.len()) {
            Ok(tr) => self.caps.view.dispatch(tr),
            Err(e) => warn!(rid = diff.rid, "could not discard rejected steps: {}", e),
        }
    }

    /// A diff from a collaborator, or a fix from the server.
    ///
    /// Counts as exactly one version. Ancillary updates are applied before
    /// the document steps.
    pub fn receive_diff(&mut self, diff: DiffMessage, server_fix: bool) {
        self.info.version += 1;
        if let Some(updates) = &diff.bu {
            self.caps.bibliography.receive(updates);
        }
        if let Some(updates) = &diff.iu {
            self.caps.images.receive(updates);
        }
        if let Some(updates) = &diff.cu {
            self.caps.comments.receive(updates);
        }

        if server_fix {
            if let Some(rid) = diff.reject_request_id {
                if let Some(rejected) = self.unconfirmed.remove(&rid) {
                    info!(rid, "server fix replaces pending diff");
                    self.discard_steps(&rejected);
                }
            }
            self.cancel_checking_version();
            self.diff_watchdog.cancel();
            self.awaiting_diff_response = false;
            // Collaborators' edits may be right behind the fix.
            let now = self.caps.clock.now();
            self.resend_watchdog.arm(now, self.config.server_fix_debounce());
        }

        if diff.ds.is_some() {
            let author = diff.cid.unwrap_or_else(|| self.info.client_id.wrapping_add(1));
            self.apply_remote_steps(&diff, author);
        }
    }

    fn apply_remote_steps(&mut self, diff: &DiffMessage, author: u32) {
        let steps = match diff.steps() {
            Ok(steps) => steps,
            Err(e) => {
                warn!(rid = diff.rid, "undecodable steps in diff: {}", e);
                self.check_version();
                return;
            }
        };
        if !steps.is_empty() {
            let authors = vec![author; steps.len()];
            match receive_transaction(self.caps.view.state(), &steps, &authors) {
                Ok(mut tr) => {
                    tr.set_meta(MetaKey::Remote, json!(true));
                    let confirmed = confirmed_doc_after(&tr, steps.len());
                    self.caps.view.dispatch(tr);
                    self.info.confirmed_doc = Some(confirmed);
                    trace!(steps = steps.len(), version = self.info.version, "remote steps applied");
                }
                Err(e) => {
                    warn!(version = self.info.version, "remote steps do not apply: {}", e);
                    self.check_version();
                }
            }
        }
        self.send_to_collaborators();
    }

    /// Show a collaborator's selection. Selections of participants we have
    /// not heard of yet are dropped.
    pub fn receive_selection_change(&mut self, selection: SelectionMessage) {
        let Some(participant) = self.participants.find(&selection.id) else {
            trace!(participant = %selection.id, "selection from unknown participant");
            return;
        };
        self.caps.view.update_collaborator_selection(participant, &selection);
    }

    /// New presence list: carets of vanished sessions are removed, and the
    /// solo-owner hook runs if we are alone on first sight.
    pub fn update_participant_list(&mut self, entries: &[ParticipantEntry]) -> PresenceChange {
        let change = self.participants.update_participant_list(entries);
        for session_id in &change.removed_sessions {
            self.caps.view.remove_collaborator_selection(session_id);
        }
        if change.solo_owner {
            if let Some(hook) = self.caps.on_solo_owner.as_mut() {
                info!(doc = %self.info.id, "sole participant, running cleanup hook");
                hook();
            }
        }
        change
    }

    /// Route one message from the server.
    pub fn handle_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Connections { participant_list } => {
                self.update_participant_list(&participant_list);
                if std::mem::take(&mut self.resubscribed) {
                    self.check_version();
                }
            }
            ServerMessage::DocData(snapshot) => self.receive_document(snapshot),
            ServerMessage::ConfirmVersion { v } => {
                self.cancel_checking_version();
                if v != self.info.version {
                    debug!(local = self.info.version, server = v, "version mismatch");
                    self.check_version();
                    return;
                }
                if !self.unconfirmed.is_empty() {
                    // The server is at our version, so it never applied them.
                    debug!(stale = self.unconfirmed.len(), "dropping unanswered diffs");
                    self.unconfirmed.clear();
                }
                self.enable_diff_sending();
            }
            ServerMessage::SelectionChange(selection) => {
                self.cancel_checking_version();
                if selection.v != self.info.version {
                    self.check_version();
                    return;
                }
                self.receive_selection_change(selection);
            }
            ServerMessage::Diff(diff) => {
                if diff.cid == Some(self.info.client_id) {
                    self.confirm_diff(diff.rid);
                    return;
                }
                if diff.v != self.info.version {
                    warn!(local = self.info.version, diff = diff.v, "diff out of sequence");
                    self.check_version();
                    return;
                }
                let server_fix = diff.server_fix;
                self.receive_diff(diff, server_fix);
            }
            ServerMessage::ConfirmDiff { rid } => self.confirm_diff(rid),
            ServerMessage::RejectDiff { rid } => self.reject_diff(rid),
            ServerMessage::PatchError => {
                warn!(doc = %self.info.id, "document out of sync with server, requesting it again");
                self.caps.transport.send(ClientMessage::GetDocument);
            }
        }
    }

    // ── Timers ───────────────────────────────────────────────────────────

    /// Earliest armed deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        [&self.diff_watchdog, &self.version_watchdog, &self.resend_watchdog]
            .into_iter()
            .filter_map(Watchdog::deadline)
            .min()
    }

    /// Fire whatever is due.
    pub fn poll_timers(&mut self) {
        let now = self.caps.clock.now();
        if self.version_watchdog.fire_if_due(now) {
            debug!("version check unanswered");
            self.checking_version = false;
        }
        if self.diff_watchdog.fire_if_due(now) {
            warn!(pending = self.unconfirmed.len(), "diff unanswered, checking version");
            self.awaiting_diff_response = false;
            self.check_version();
        }
        if self.resend_watchdog.fire_if_due(now) {
            debug!("server fix settled, resuming sends");
            self.enable_diff_sending();
        }
    }
}

/// The document after the remote steps of a rebase transaction, before
/// local steps were redone on top.
fn confirmed_doc_after(tr: &Transaction, remote: usize) -> Node {
    let rebased = tr.meta(&MetaKey::Rebased).and_then(Value::as_u64).unwrap_or(0) as usize;
    tr.docs().get(rebased + remote).unwrap_or_else(|| tr.doc()).clone()
}

/// The editor's document with its unconfirmed steps undone.
fn without_unconfirmed(state: &EditorState) -> Option<Node> {
    let mut doc = state.doc().clone();
    for rebaseable in state.collab().unconfirmed().iter().rev() {
        doc = rebaseable.inverted.apply(&doc).ok()?;
    }
    Some(doc)
}

/// Title of a document: the text of its first textblock, leaving out
/// deleted text, cut to `max_chars`.
pub fn document_title(doc: &Node, max_chars: usize) -> String {
    let mut block = doc.first_child();
    while let Some(node) = block {
        if node.is_textblock() {
            break;
        }
        block = node.first_child();
    }
    let Some(block) = block else {
        return String::new();
    };
    block
        .content()
        .iter()
        .filter(|child| !child.has_mark(MarkType::Deletion))
        .map(Node::text_content)
        .collect::<String>()
        .chars()
        .take(max_chars)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use quire_doc::build::*;
    use quire_doc::{DeletionAttrs, Mark};

    fn deletion() -> Mark {
        Mark::Deletion(DeletionAttrs {
            user: "u1".into(),
            username: "Ann".into(),
            date: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        })
    }

    #[test]
    fn test_title_skips_deleted_text() {
        let d = doc(vec![h(1, vec![text("Draft "), marked("old ", vec![deletion()]), text("plan")])]);
        assert_eq!(document_title(&d, 255), "Draft plan");
    }

    #[test]
    fn test_title_descends_to_first_textblock() {
        let d = doc(vec![blockquote(vec![p(vec![text("Quoted")])]), p(vec![text("Body")])]);
        assert_eq!(document_title(&d, 255), "Quoted");
    }

    #[test]
    fn test_title_truncated() {
        let d = doc(vec![p(vec![text("abcdef")])]);
        assert_eq!(document_title(&d, 4), "abcd");
        assert_eq!(document_title(&doc(vec![]), 4), "");
    }
}
