//! Runs a [`DocSyncSession`] on a tokio task.
//!
//! ```text
//!   SessionHandle (Clone)       mpsc       session task
//!   ┌──────────────────────┐  ────────▶  ┌───────────────────────────┐
//!   │ .deliver(msg)        │             │ DocSyncSession            │
//!   │ .edit(tr)            │  ◀────────  │ sleeps until next_deadline│
//!   │ .snapshot()          │   oneshot   │ then poll_timers()        │
//!   └──────────────────────┘             └───────────────────────────┘
//! ```
//!
//! Commands are handled one at a time, so the session never sees two
//! inputs at once. The task ends when every handle is dropped and returns
//! the session.

use quire_doc::{Node, Step, Transaction};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::messages::ServerMessage;
use crate::session::DocSyncSession;

// ============================================================================
// Error Type
// ============================================================================

/// Errors from talking to a session task.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("session task shut down")]
    Shutdown,
}

// ============================================================================
// Commands (internal)
// ============================================================================

enum SessionCommand {
    Server(ServerMessage),
    Local(Transaction),
    Resubscribed,
    FinishTemplate(Vec<Step>),
    Snapshot { reply: oneshot::Sender<SessionSnapshot> },
}

/// Point-in-time view of a running session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub version: u64,
    /// The editor's document, unconfirmed steps included.
    pub doc: Node,
    pub confirmed_doc: Option<Node>,
    pub pending_diffs: usize,
    pub awaiting_diff_response: bool,
}

// ============================================================================
// SessionHandle
// ============================================================================

/// Cloneable handle for sending commands to a running session task.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Hand a server message to the session.
    pub fn deliver(&self, message: ServerMessage) -> Result<(), DriverError> {
        self.send(SessionCommand::Server(message))
    }

    /// Dispatch a local editor transaction.
    pub fn edit(&self, tr: Transaction) -> Result<(), DriverError> {
        self.send(SessionCommand::Local(tr))
    }

    pub fn resubscribed(&self) -> Result<(), DriverError> {
        self.send(SessionCommand::Resubscribed)
    }

    pub fn finish_template(&self, steps: Vec<Step>) -> Result<(), DriverError> {
        self.send(SessionCommand::FinishTemplate(steps))
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot { reply })?;
        rx.await.map_err(|_| DriverError::Shutdown)
    }

    fn send(&self, command: SessionCommand) -> Result<(), DriverError> {
        self.tx.send(command).map_err(|_| DriverError::Shutdown)
    }
}

// ============================================================================
// Task
// ============================================================================

/// Spawn `session` on the current runtime.
pub fn spawn_session(session: DocSyncSession) -> (SessionHandle, JoinHandle<DocSyncSession>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(session, rx));
    (SessionHandle { tx }, task)
}

async fn run(mut session: DocSyncSession, mut rx: mpsc::UnboundedReceiver<SessionCommand>) -> DocSyncSession {
    loop {
        let deadline = session.next_deadline();
        tokio::select! {
            command = rx.recv() => match command {
                Some(command) => handle(&mut session, command),
                None => break,
            },
            _ = sleep_until_deadline(deadline), if deadline.is_some() => {
                trace!("session timer due");
                session.poll_timers();
            }
        }
    }
    debug!(doc = %session.doc_info().id, version = session.version(), "session task finished");
    session
}

async fn sleep_until_deadline(deadline: Option<std::time::Instant>) {
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(Instant::from_std(deadline)).await;
    }
}

fn handle(session: &mut DocSyncSession, command: SessionCommand) {
    match command {
        SessionCommand::Server(message) => session.handle_message(message),
        SessionCommand::Local(tr) => session.dispatch_local(tr),
        SessionCommand::Resubscribed => session.resubscribed(),
        SessionCommand::FinishTemplate(steps) => session.finish_template_adjustment(&steps),
        SessionCommand::Snapshot { reply } => {
            let snapshot = SessionSnapshot {
                version: session.version(),
                doc: session.state().doc().clone(),
                confirmed_doc: session.doc_info().confirmed_doc.clone(),
                pending_diffs: session.pending_diffs().count(),
                awaiting_diff_response: session.is_awaiting_diff_response(),
            };
            let _ = reply.send(snapshot);
        }
    }
}
