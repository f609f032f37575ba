//! Collaborative editing of Quire documents.
//!
//! A [`DocSyncSession`] keeps one open document in step with the server:
//! it sends local changes as versioned diffs, one in flight at a time,
//! merges collaborators' diffs by rebasing unconfirmed steps, and recovers
//! from lost or refused messages by checking its version. A
//! [`ParticipantRegistry`] tracks who else is present.
//!
//! The session reaches the outside world only through [`Capabilities`]:
//! transport, editor view, identity, ancillary stores and a clock. Wire
//! messages are [`ClientMessage`] and [`ServerMessage`].
//!
//! ```text
//!  editor ──dispatch_local──▶ DocSyncSession ──ClientMessage──▶ Transport
//!                                   ▲
//!  server ──ServerMessage──handle_message
//! ```
//!
//! [`spawn_session`] runs a session on a tokio task and fires its timers.

mod capabilities;
mod config;
pub mod constants;
mod driver;
mod messages;
mod participants;
mod session;
mod timer;

pub use capabilities::{
    AncillaryStore, Capabilities, ChannelTransport, Clock, EditorView, HeadlessView, Identity,
    ManualClock, MemoryStore, SystemClock, Transport,
};
pub use config::{ConfigError, SyncConfig};
pub use driver::{DriverError, SessionHandle, SessionSnapshot, spawn_session};
pub use messages::{
    ClientMessage, DiffMessage, DocContent, DocInfoMessage, DocumentSnapshot, SelectionMessage,
    ServerMessage,
};
pub use participants::{Participant, ParticipantEntry, ParticipantRegistry, PresenceChange};
pub use session::{DocInfo, DocSyncSession, LoadPhase, UnconfirmedDiff, document_title};
pub use timer::Watchdog;

pub use quire_track::User;
