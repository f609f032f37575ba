//! Track changes for Quire documents.
//!
//! Every local edit passes through [`amend_transaction`] before it is
//! dispatched. With tracking on, deletions become deletion annotations,
//! insertions get insertion annotations, and formatting and block type
//! changes are recorded with what they replaced, so that reviewers can
//! later accept or reject them ([`accept_changes`], [`reject_changes`]).
//!
//! # Where annotations live
//!
//! - Text and other inline nodes: `insertion`, `deletion` and
//!   `format_change` marks, dated to ten minutes.
//! - Blocks: entries in the `track` attribute ([`TrackAttr`]), dated to the
//!   minute.
//!
//! A user deleting their own unapproved insertion removes it outright
//! instead of annotating it.

mod amend;
pub mod constants;
mod deletion;
mod format;
mod insertion;
mod review;
mod user;
mod wrapping;

pub use amend::{amend_transaction, tracked_transaction};
pub use review::{
    ALL_CHANGES, Resolution, accept_all, accept_all_no_insertions, accept_changes, has_changes,
    reject_all, reject_changes, resolve,
};
pub use user::{TrackDates, User};

pub use quire_doc::{BlockState, TrackAttr, TrackKind};
