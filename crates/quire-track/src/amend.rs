//! Rewriting user transactions into tracked changes.
//!
//! A plain edit deletes and inserts content. Rewritten, the same edit keeps
//! deleted content in place with a deletion annotation and annotates
//! inserted content as an insertion, both attributed to the user. Steps are
//! processed in order; each is first mapped through everything the rewrite
//! did so far, since earlier steps may have been applied differently (or not
//! at all) than in the original transaction.

use chrono::{DateTime, Utc};
use quire_doc::{
    Bias, EditorState, Mappable, Mapping, MetaKey, Node, ReplaceAroundStep,
    ReplaceStep, Selection, Step, Transaction, Walk,
};
use tracing::{debug, trace};

use crate::constants::{
    CELL_DELETE_INPUT_TYPES, DELETE_BACKWARD, HISTORY_INPUT_TYPES, TRACKABLE_META,
};
use crate::deletion::mark_deletion;
use crate::format::track_mark_step;
use crate::insertion::mark_insertion;
use crate::wrapping::mark_wrapping;
use crate::{TrackDates, User};

/// Rewrite `tr` into a tracked transaction if it is a user edit.
///
/// Transactions that change nothing, carry meta beyond input information
/// (remote changes, rebases, ...) or come from undo/redo are returned as
/// they are. With tracking disabled the edit is still annotated, but as
/// approved.
pub fn amend_transaction(
    tr: Transaction,
    state: &EditorState,
    user: &User,
    tracking_enabled: bool,
    now: DateTime<Utc>,
) -> Transaction {
    if !tr.doc_changed() || !is_user_edit(&tr) {
        return tr;
    }
    tracked_transaction(&tr, state, user, !tracking_enabled, now)
}

fn is_user_edit(tr: &Transaction) -> bool {
    let plain_meta = tr.meta_keys().all(|key| TRACKABLE_META.contains(key));
    let history = tr.input_type().is_some_and(|t| HISTORY_INPUT_TYPES.contains(&t));
    plain_meta && !history
}

struct Rewrite<'a> {
    tr: &'a Transaction,
    state: &'a EditorState,
    user: &'a User,
    dates: TrackDates,
    approved: bool,
    cell_delete: bool,
    new_tr: Transaction,
    /// Maps positions of the original transaction onto `new_tr`.
    map: Mapping,
}

/// Build a transaction from `state` that performs `tr`'s edits as tracked
/// changes by `user`.
pub fn tracked_transaction(
    tr: &Transaction,
    state: &EditorState,
    user: &User,
    approved: bool,
    now: DateTime<Utc>,
) -> Transaction {
    // Tables delete rows by clearing every cell; that must not insert the
    // empty replacement paragraphs as tracked content.
    let cell_delete = tr.input_type().is_some_and(|t| CELL_DELETE_INPUT_TYPES.contains(&t))
        && state.selection().is_cell();
    let mut rewrite = Rewrite {
        tr,
        state,
        user,
        dates: TrackDates::new(now),
        approved,
        cell_delete,
        new_tr: state.tr(),
        map: Mapping::new(),
    };

    for (index, original) in tr.steps().iter().enumerate() {
        let Some(step) = original.map(&rewrite.map) else {
            trace!(index, "step mapped away");
            continue;
        };
        let doc = rewrite.new_tr.doc().clone();
        match step {
            Step::Replace(step) => rewrite.replace(index, original, step),
            step if approved => {
                rewrite.apply(step);
            }
            Step::ReplaceAround(step) => rewrite.replace_around(index, original, &doc, step),
            Step::AddMark(step) => {
                track_mark_step(&mut rewrite.new_tr, &doc, &step, true, user, &rewrite.dates)
            }
            Step::RemoveMark(step) => {
                track_mark_step(&mut rewrite.new_tr, &doc, &step, false, user, &rewrite.dates)
            }
            step @ Step::Attr(_) => {
                rewrite.apply(step);
            }
        }
    }

    rewrite.finish()
}

impl Rewrite<'_> {
    fn apply(&mut self, step: Step) -> bool {
        match self.new_tr.step(step) {
            Ok(()) => true,
            Err(e) => {
                debug!("dropping step that no longer applies: {}", e);
                false
            }
        }
    }

    /// Append the map of the original step's inverse: the original step was
    /// not applied where it was. Returns the map index for mirroring.
    fn undo_original(&mut self, index: usize, original: &Step) -> Option<usize> {
        let inverted = original.invert(&self.tr.docs()[index]).ok()?.map(&self.map)?;
        self.map.append_map(inverted.get_map(), None);
        Some(self.map.len() - 1)
    }

    fn replace(&mut self, index: usize, original: &Step, step: ReplaceStep) {
        let inserted = if self.approved {
            Some(step.clone())
        } else if step.slice.size() > 0 && !self.cell_delete {
            // Insert after the replaced range so nothing is deleted.
            Some(ReplaceStep { from: step.to, ..step.clone() })
        } else {
            None
        };
        let mirror = self.undo_original(index, original);
        if let Some(inserted) = inserted {
            self.insert(inserted, mirror);
        }
        if !self.approved && step.from != step.to {
            let removed = mark_deletion(&mut self.new_tr, step.from, step.to, self.user, &self.dates);
            self.map.append_mapping(&removed);
        }
    }

    /// Apply `inserted` on a scratch transaction, annotate the inserted
    /// range, then condense the result into a single replace step.
    fn insert(&mut self, inserted: ReplaceStep, mirror: Option<usize>) {
        let mut scratch = self.state.apply(&self.new_tr).tr();
        let step = Step::Replace(inserted.clone());
        let inserted_to = step.get_map().map(inserted.to, Bias::After);
        if let Err(e) = scratch.step(step) {
            debug!("insertion no longer applies: {}", e);
            return;
        }
        mark_insertion(&mut scratch, inserted.from, inserted_to, self.user, &self.dates, self.approved);
        let slice = match scratch.doc().slice(inserted.from, inserted_to) {
            Ok(slice) => slice,
            Err(e) => {
                debug!("cannot slice annotated insertion: {}", e);
                return;
            }
        };
        let condensed = Step::Replace(ReplaceStep::new(inserted.from, inserted.to, slice));
        let condensed_map = condensed.get_map();
        if self.apply(condensed) {
            self.map.append_map(condensed_map, mirror);
            let selection = scratch.selection();
            if self.new_tr.selection() != selection {
                self.new_tr.set_selection(selection);
            }
        }
    }

    fn replace_around(&mut self, index: usize, original: &Step, doc: &Node, step: ReplaceAroundStep) {
        let whole = Step::ReplaceAround(step.clone());
        let step_map = whole.get_map();
        if step.from == step.gap_from && step.to == step.gap_to {
            // Wrapped in a new node: the wrapper is the insertion.
            if self.apply(whole) {
                let from = step_map.map(step.from, Bias::Before);
                let to = step_map.map(step.gap_from, Bias::After);
                mark_insertion(&mut self.new_tr, from, to, self.user, &self.dates, false);
            }
        } else if step.slice.size() == 0 || step.slice.content().child_count() == 2 {
            // Unwrapped: keep the wrapper, marked deleted.
            self.undo_original(index, original);
            let removed = mark_deletion(&mut self.new_tr, step.from, step.gap_from, self.user, &self.dates);
            self.map.append_mapping(&removed);
        } else if step.slice.size() == 2
            && step.gap_from == step.from + 1
            && step.to == step.gap_to + 1
        {
            // One wrapping node replaced by another (paragraph to heading).
            if self.apply(whole) {
                if let (Some(old), Some(new)) = (doc.node_at(step.from), step.slice.content().first_child()) {
                    if old.has_track_attr() {
                        mark_wrapping(&mut self.new_tr, step.from, old, new, self.user, &self.dates);
                    }
                }
            }
        } else if self.apply(whole) {
            let ranges = [
                (step_map.map(step.from, Bias::Before), step_map.map(step.gap_from, Bias::After)),
                (step_map.map(step.gap_to, Bias::Before), step_map.map(step.to, Bias::After)),
            ];
            for (from, to) in ranges {
                let mut touched = false;
                doc.nodes_between(from, to, |v| {
                    if v.pos < from {
                        return Walk::Descend;
                    }
                    touched = true;
                    Walk::Stop
                });
                if touched {
                    mark_insertion(&mut self.new_tr, from, to, self.user, &self.dates, false);
                }
            }
        }
    }

    fn finish(mut self) -> Transaction {
        for key in [MetaKey::InputType, MetaKey::UiEvent] {
            if let Some(value) = self.tr.meta(&key) {
                self.new_tr.set_meta(key.clone(), value.clone());
            }
        }

        if self.tr.selection_set() {
            let selection = self.tr.selection();
            let backward = selection.is_text()
                && (selection.from() < self.state.selection().from()
                    || self.tr.input_type() == Some(DELETE_BACKWARD));
            let next = if backward {
                let caret = self.map.map(selection.from(), Bias::Before);
                Selection::caret(caret.min(self.new_tr.doc().content_size()))
            } else {
                selection.map(self.new_tr.doc(), &self.map)
            };
            self.new_tr.set_selection(next);
        }
        if self.tr.stored_marks_set() {
            if let Some(marks) = self.tr.stored_marks() {
                self.new_tr.set_stored_marks(Some(marks.to_vec()));
            }
        }

        self.new_tr.scroll_into_view();
        self.new_tr
    }
}
