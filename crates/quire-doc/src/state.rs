//! Editor state.

use crate::{CollabState, Mark, Node, Selection, Transaction};

/// A document with its selection, stored marks and collab bookkeeping.
///
/// States are values: [`EditorState::apply`] returns a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    doc: Node,
    selection: Selection,
    stored_marks: Option<Vec<Mark>>,
    collab: CollabState,
}

impl EditorState {
    /// A state with the caret at the first text position.
    pub fn new(doc: Node, collab: CollabState) -> Self {
        let selection = Selection::at_start(&doc);
        Self { doc, selection, stored_marks: None, collab }
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_stored_marks(mut self, marks: Option<Vec<Mark>>) -> Self {
        self.stored_marks = marks;
        self
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn collab(&self) -> &CollabState {
        &self.collab
    }

    /// Start a transaction from this state.
    pub fn tr(&self) -> Transaction {
        Transaction::new(self.doc.clone(), self.selection.clone(), self.stored_marks.clone())
    }

    /// The state after `tr`.
    ///
    /// Local document changes are recorded as unconfirmed collab steps
    /// unless the transaction installs its own collab state.
    pub fn apply(&self, tr: &Transaction) -> EditorState {
        let collab = match tr.collab() {
            Some(collab) => collab.clone(),
            None if tr.doc_changed() => self.collab.with_local_steps(tr),
            None => self.collab.clone(),
        };
        EditorState {
            doc: tr.doc().clone(),
            selection: tr.selection(),
            stored_marks: tr.stored_marks().map(<[Mark]>::to_vec),
            collab,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::*;

    #[test]
    fn test_apply_records_unconfirmed() {
        let state = EditorState::new(doc(vec![p(vec![text("abc")])]), CollabState::new(3, 7));
        let mut tr = state.tr();
        tr.insert(2, vec![text("X")]).unwrap();
        tr.delete(1, 2).unwrap();
        let next = state.apply(&tr);
        assert_eq!(next.doc().text_content(), "Xbc");
        assert_eq!(next.collab().version(), 3);
        assert_eq!(next.collab().unconfirmed().len(), 2);

        // Inverting the recorded steps in reverse restores the original doc.
        let mut undo = next.tr();
        for rebaseable in next.collab().unconfirmed().iter().rev() {
            undo.step(rebaseable.inverted.clone()).unwrap();
        }
        assert_eq!(undo.doc(), state.doc());
    }

    #[test]
    fn test_selection_only_keeps_collab() {
        let state = EditorState::new(doc(vec![p(vec![text("abc")])]), CollabState::new(0, 1));
        let mut tr = state.tr();
        tr.set_selection(Selection::caret(3));
        let next = state.apply(&tr);
        assert_eq!(next.selection(), &Selection::caret(3));
        assert!(next.collab().unconfirmed().is_empty());
    }
}
