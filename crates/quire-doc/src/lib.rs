//! Document model, steps and position mapping for Quire.
//!
//! Documents are immutable trees of [`Node`]s. Every change is expressed as a
//! [`Step`]: an atomic, invertible, JSON-serializable edit that can be sent
//! over the wire and replayed on another client. Each step produces a
//! [`StepMap`] describing how positions moved, and a [`Mapping`] chains those
//! so positions (selections, pending edits, cursors of other participants)
//! can follow a whole series of changes.
//!
//! # Layers
//!
//! - **Model**: [`Node`], [`Fragment`], [`Slice`], [`ResolvedPos`] and the
//!   schema ([`NodeType`], [`Mark`]).
//! - **Steps**: [`Step`] with apply, invert and map.
//! - **Transforms**: [`Transform`] accumulates steps, [`Transaction`] adds a
//!   selection and metadata, [`EditorState::apply`] produces the next state.
//! - **Collab**: [`receive_transaction`] rebases unconfirmed local steps over
//!   steps confirmed by the server.
//!
//! # Track annotations
//!
//! Tracked insertions, deletions and format changes on text are marks
//! ([`Mark::Insertion`], [`Mark::Deletion`], [`Mark::FormatChange`]). On
//! blocks they live in the `track` attribute as a list of [`TrackAttr`].

mod collab;
mod error;
mod fragment;
mod mapping;
pub mod mark;
mod node;
mod replace;
mod resolved;
mod schema;
mod selection;
mod slice;
mod state;
mod step;
mod track;
mod transaction;
mod transform;
mod traverse;

pub mod build;

pub use collab::{
    CollabState, Rebaseable, SendableSteps, discard_unconfirmed, receive_transaction,
    sendable_steps,
};
pub use error::{ModelError, StepError};
pub use fragment::Fragment;
pub use mapping::{Bias, Deleted, MapResult, Mappable, Mapping, Recover, StepMap};
pub use mark::{
    DeletionAttrs, FormatChangeAttrs, InsertionAttrs, LinkAttrs, Mark, MarkType, find_mark,
};
pub use node::Node;
pub use resolved::ResolvedPos;
pub use schema::{Attrs, ContentKind, NodeType, TRACK_ATTR};
pub use selection::Selection;
pub use slice::Slice;
pub use state::EditorState;
pub use step::{AttrStep, MarkStep, ReplaceAroundStep, ReplaceStep, Step};
pub use track::{BlockState, TrackAttr, TrackKind};
pub use transaction::{MetaKey, Transaction};
pub use transform::{RemoveMarks, Transform};
pub use traverse::{Visit, Walk};

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
