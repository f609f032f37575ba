//! Track-changes constants.

use quire_doc::{MarkType, MetaKey};

/// Formatting marks whose addition or removal is recorded as a
/// `format_change`.
pub const SUPPORTED_FORMAT_MARKS: [MarkType; 4] =
    [MarkType::Italic, MarkType::Bold, MarkType::Code, MarkType::Underline];

/// Meta keys a transaction may carry and still be rewritten. Anything else
/// (remote, rebased, ...) passes through untouched.
pub const TRACKABLE_META: [MetaKey; 3] = [MetaKey::InputType, MetaKey::UiEvent, MetaKey::Paste];

/// Input types of undo/redo, which are never rewritten.
pub const HISTORY_INPUT_TYPES: [&str; 2] = ["historyUndo", "historyRedo"];

/// Input types that, with a cell selection, clear table cells.
pub const CELL_DELETE_INPUT_TYPES: [&str; 2] = ["deleteContentBackward", "deleteContentForward"];

pub const DELETE_BACKWARD: &str = "deleteContentBackward";

/// Block annotations are dated to the minute.
pub const BLOCK_DATE_MINUTES: i64 = 1;

/// Mark annotations are dated to ten minutes, so a typing session yields
/// one mergeable mark.
pub const MARK_DATE_MINUTES: i64 = 10;
