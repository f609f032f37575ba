//! What a session needs from its surroundings.
//!
//! A [`DocSyncSession`](crate::DocSyncSession) is handed these at
//! construction and reaches nothing else: the network, the editor, the
//! acting user, the comment/bibliography/image stores and the clock. Each
//! has a simple in-memory implementation here for headless use and tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use quire_doc::{
    Attrs, Bias, CollabState, EditorState, Fragment, Mappable, Node, NodeType, Transaction,
};
use quire_track::User;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::messages::{ClientMessage, SelectionMessage};
use crate::participants::Participant;

// ============================================================================
// Traits
// ============================================================================

/// Outbound half of the server connection. Fire and forget.
pub trait Transport: Send {
    fn send(&mut self, message: ClientMessage);

    /// Whether messages currently reach the server.
    fn is_connected(&self) -> bool {
        true
    }
}

/// The editing surface.
pub trait EditorView: Send {
    fn state(&self) -> &EditorState;

    /// Apply a transaction to the current state.
    fn dispatch(&mut self, tr: Transaction);

    /// Replace the state wholesale, as on document load.
    fn set_state(&mut self, state: EditorState);

    /// Show a collaborator's caret or selection.
    fn update_collaborator_selection(&mut self, participant: &Participant, selection: &SelectionMessage);

    fn remove_collaborator_selection(&mut self, session_id: &str);

    /// The `(anchor, head)` shown for a collaborator session, if any.
    fn collaborator_selection(&self, session_id: &str) -> Option<(usize, usize)>;
}

/// A store whose changes travel with diffs (`cu`, `bu`, `iu`).
pub trait AncillaryStore: Send {
    /// Local events not yet confirmed by the server.
    fn unsent_events(&mut self) -> Vec<Value>;

    /// The server confirmed these events.
    fn events_sent(&mut self, events: &[Value]);

    /// Apply updates from collaborators.
    fn receive(&mut self, updates: &[Value]);
}

/// The acting user, stamped on every tracked change.
pub trait Identity: Send {
    fn user(&self) -> User;
}

impl Identity for User {
    fn user(&self) -> User {
        self.clone()
    }
}

pub trait Clock: Send {
    /// Monotonic time for deadlines.
    fn now(&self) -> Instant;

    /// Wall-clock time for annotation dates.
    fn utc(&self) -> DateTime<Utc>;
}

/// Everything a session is built from.
pub struct Capabilities {
    pub transport: Box<dyn Transport>,
    pub view: Box<dyn EditorView>,
    pub identity: Box<dyn Identity>,
    pub comments: Box<dyn AncillaryStore>,
    pub bibliography: Box<dyn AncillaryStore>,
    pub images: Box<dyn AncillaryStore>,
    pub clock: Box<dyn Clock>,
    /// Runs once when this session turns out to be alone on the document.
    pub on_solo_owner: Option<Box<dyn FnMut() + Send>>,
}

impl Capabilities {
    /// Empty stores, the system clock, no solo-owner hook.
    pub fn new(
        transport: impl Transport + 'static,
        view: impl EditorView + 'static,
        identity: impl Identity + 'static,
    ) -> Self {
        Self {
            transport: Box::new(transport),
            view: Box::new(view),
            identity: Box::new(identity),
            comments: Box::new(MemoryStore::default()),
            bibliography: Box::new(MemoryStore::default()),
            images: Box::new(MemoryStore::default()),
            clock: Box::new(SystemClock),
            on_solo_owner: None,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_comments(mut self, store: impl AncillaryStore + 'static) -> Self {
        self.comments = Box::new(store);
        self
    }

    pub fn with_bibliography(mut self, store: impl AncillaryStore + 'static) -> Self {
        self.bibliography = Box::new(store);
        self
    }

    pub fn with_images(mut self, store: impl AncillaryStore + 'static) -> Self {
        self.images = Box::new(store);
        self
    }

    pub fn on_solo_owner(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.on_solo_owner = Some(Box::new(hook));
        self
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Sends into an unbounded channel; the receiving end writes to the socket.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::UnboundedSender<ClientMessage>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ClientMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, message: ClientMessage) {
        if self.tx.send(message).is_err() {
            debug!("transport closed, message dropped");
        }
    }

    fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

// ============================================================================
// Headless view
// ============================================================================

/// An editor with no rendering: holds the state and collaborator carets.
#[derive(Debug, Clone)]
pub struct HeadlessView {
    state: EditorState,
    carets: IndexMap<String, (usize, usize)>,
}

impl HeadlessView {
    /// An empty document, until one is loaded.
    pub fn new() -> Self {
        let doc = Node::new(NodeType::Doc, Attrs::new(), Fragment::empty(), Vec::new());
        Self { state: EditorState::new(doc, CollabState::new(0, 0)), carets: IndexMap::new() }
    }
}

impl Default for HeadlessView {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorView for HeadlessView {
    fn state(&self) -> &EditorState {
        &self.state
    }

    fn dispatch(&mut self, tr: Transaction) {
        if tr.doc_changed() {
            let size = tr.doc().content_size();
            for (anchor, head) in self.carets.values_mut() {
                *anchor = tr.mapping().map(*anchor, Bias::After).min(size);
                *head = tr.mapping().map(*head, Bias::After).min(size);
            }
        }
        self.state = self.state.apply(&tr);
    }

    fn set_state(&mut self, state: EditorState) {
        self.state = state;
        self.carets.clear();
    }

    fn update_collaborator_selection(&mut self, _participant: &Participant, selection: &SelectionMessage) {
        let size = self.state.doc().content_size();
        self.carets.insert(
            selection.session_id.clone(),
            (selection.anchor.min(size), selection.head.min(size)),
        );
    }

    fn remove_collaborator_selection(&mut self, session_id: &str) {
        self.carets.shift_remove(session_id);
    }

    fn collaborator_selection(&self, session_id: &str) -> Option<(usize, usize)> {
        self.carets.get(session_id).copied()
    }
}

// ============================================================================
// Memory store
// ============================================================================

/// A shared in-memory event store. Clones share the same events.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Debug, Default)]
struct StoreInner {
    unsent: Vec<Value>,
    received: Vec<Value>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a local event to be sent with the next diff.
    pub fn push(&self, event: Value) {
        self.lock().unsent.push(event);
    }

    pub fn unsent(&self) -> Vec<Value> {
        self.lock().unsent.clone()
    }

    /// Updates received from collaborators, oldest first.
    pub fn received(&self) -> Vec<Value> {
        self.lock().received.clone()
    }
}

impl AncillaryStore for MemoryStore {
    fn unsent_events(&mut self) -> Vec<Value> {
        self.unsent()
    }

    fn events_sent(&mut self, events: &[Value]) {
        self.lock().unsent.retain(|e| !events.contains(e));
    }

    fn receive(&mut self, updates: &[Value]) {
        self.lock().received.extend_from_slice(updates);
    }
}

// ============================================================================
// Clocks
// ============================================================================

/// The real clock. Monotonic time comes from tokio, so paused test time
/// applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    start: Instant,
    start_utc: DateTime<Utc>,
    elapsed_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_utc: DateTime<Utc>) -> Self {
        Self { start: Instant::now(), start_utc, elapsed_ms: Arc::new(AtomicU64::new(0)) }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    fn elapsed(&self) -> u64 {
        self.elapsed_ms.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + Duration::from_millis(self.elapsed())
    }

    fn utc(&self) -> DateTime<Utc> {
        self.start_utc + TimeDelta::milliseconds(self.elapsed() as i64)
    }
}
