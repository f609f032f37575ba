//! Error types for document and step operations.

use thiserror::Error;

use crate::NodeType;

/// Errors raised by the document model: resolving positions, slicing and
/// the replace algorithm.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Position outside the document or fragment.
    #[error("position {pos} out of range (size {size})")]
    PositionOutOfRange { pos: usize, size: usize },

    /// Range end before its start.
    #[error("reversed range {from}..{to}")]
    ReversedRange { from: usize, to: usize },

    /// Two nodes on either side of a replaced range cannot be joined.
    #[error("cannot join {sub} onto {main}")]
    CannotJoin { main: NodeType, sub: NodeType },

    /// Content does not match what the node type accepts.
    #[error("invalid content for node {0}")]
    InvalidContent(NodeType),

    /// The slice is opened deeper than the position it is inserted at.
    #[error("inserted content deeper than insertion position")]
    SliceTooDeep,

    /// The open depths of the slice do not line up with both ends of the range.
    #[error("inconsistent open depths")]
    InconsistentOpenDepths,

    /// Removing a range that crosses node boundaries unevenly.
    #[error("removing non-flat range")]
    NonFlatRange,

    /// Text nodes must not be empty.
    #[error("empty text nodes are not allowed")]
    EmptyText,

    /// A text node without text, or text on a non-text node.
    #[error("text content mismatch on {0} node")]
    TextMismatch(NodeType),
}

/// Errors raised when a step cannot be applied to a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// The underlying replace failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The step's positions are out of order.
    #[error("invalid step range {from}..{to}")]
    InvalidRange { from: usize, to: usize },

    /// A structure-only step would delete real content.
    #[error("structure replace would overwrite content")]
    StructureOverwrite,

    /// The gap of a replace-around step is not a flat range.
    #[error("gap is not a flat range")]
    GapNotFlat,

    /// The gap content does not fit at the slice's insert position.
    #[error("content does not fit in gap")]
    GapMismatch,

    /// An attribute step points at a position with no node after it.
    #[error("no node at position {0}")]
    NoNodeAt(usize),
}
