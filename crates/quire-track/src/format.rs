//! Tracked formatting changes.

use quire_doc::{FormatChangeAttrs, Mark, MarkStep, MarkType, Node, Transaction, Walk, find_mark};
use tracing::debug;

use crate::constants::SUPPORTED_FORMAT_MARKS;
use crate::{TrackDates, User};

/// Apply a mark addition (`adding`) or removal from `step` to `tr`,
/// skipping deleted text and keeping each node's `format_change` mark in
/// sync. `doc` is the document the step was mapped onto.
pub(crate) fn track_mark_step(
    tr: &mut Transaction,
    doc: &Node,
    step: &MarkStep,
    adding: bool,
    user: &User,
    dates: &TrackDates,
) {
    let mark_type = step.mark.mark_type();
    doc.nodes_between(step.from, step.to, |v| {
        let node = v.node;
        if !node.is_inline() {
            return Walk::Descend;
        }
        if node.has_mark(MarkType::Deletion) {
            return Walk::Skip;
        }
        let start = v.pos.max(step.from);
        let end = (v.pos + node.node_size()).min(step.to);
        let changed = if adding {
            tr.add_mark(start, end, step.mark.clone())
        } else {
            tr.remove_mark(start, end, step.mark.clone())
        };
        if let Err(e) = changed {
            debug!("mark change at {}..{} skipped: {}", start, end, e);
        }

        if !SUPPORTED_FORMAT_MARKS.contains(&mark_type) || node.has_mark(mark_type) == adding {
            return Walk::Skip;
        }
        let existing = match find_mark(node.marks(), MarkType::FormatChange) {
            Some(Mark::FormatChange(attrs)) => Some(attrs),
            _ => None,
        };
        let (before, after) = format_change_lists(existing, mark_type, adding);
        let recorded = if !before.is_empty() || !after.is_empty() {
            let mark = Mark::FormatChange(FormatChangeAttrs {
                user: user.id.clone(),
                username: user.username.clone(),
                date: dates.mark,
                before,
                after,
            });
            tr.add_mark(start, end, mark)
        } else if let Some(existing) = existing {
            tr.remove_mark(start, end, Mark::FormatChange(existing.clone()))
        } else {
            Ok(())
        };
        if let Err(e) = recorded {
            debug!("format change at {}..{} skipped: {}", start, end, e);
        }
        Walk::Skip
    });
}

/// New `(before, after)` lists after `mark_type` was added or removed.
/// Undoing an earlier tracked change cancels it instead of recording the
/// opposite.
fn format_change_lists(
    existing: Option<&FormatChangeAttrs>,
    mark_type: MarkType,
    adding: bool,
) -> (Vec<MarkType>, Vec<MarkType>) {
    let without = |list: &[MarkType]| -> Vec<MarkType> {
        list.iter().copied().filter(|m| *m != mark_type).collect()
    };
    let with = |list: &[MarkType]| -> Vec<MarkType> {
        let mut list = list.to_vec();
        list.push(mark_type);
        list
    };
    match (existing, adding) {
        (Some(fc), true) if fc.before.contains(&mark_type) => (without(&fc.before), fc.after.clone()),
        (Some(fc), true) => (fc.before.clone(), with(&fc.after)),
        (None, true) => (Vec::new(), vec![mark_type]),
        (Some(fc), false) if fc.after.contains(&mark_type) => (fc.before.clone(), without(&fc.after)),
        (Some(fc), false) => (with(&fc.before), fc.after.clone()),
        (None, false) => (vec![mark_type], Vec::new()),
    }
}
