//! Editor transactions: a transform plus selection, stored marks and meta.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

use serde_json::Value;

use crate::{CollabState, Mark, Node, Selection, Transform};

/// Keys for transaction metadata.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetaKey {
    /// The DOM input type that produced the edit (`insertText`,
    /// `deleteContentBackward`, `historyUndo`, ...).
    InputType,
    /// `"paste"`, `"cut"` or `"drop"`.
    UiEvent,
    Paste,
    /// Applied on behalf of another participant.
    Remote,
    /// Number of unconfirmed steps rebased by a collab receive.
    Rebased,
    AddToHistory,
    Other(String),
}

impl MetaKey {
    pub fn as_str(&self) -> &str {
        match self {
            MetaKey::InputType => "inputType",
            MetaKey::UiEvent => "uiEvent",
            MetaKey::Paste => "paste",
            MetaKey::Remote => "remote",
            MetaKey::Rebased => "rebased",
            MetaKey::AddToHistory => "addToHistory",
            MetaKey::Other(name) => name,
        }
    }
}

impl fmt::Display for MetaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for MetaKey {
    fn from(name: &str) -> Self {
        match name {
            "inputType" => MetaKey::InputType,
            "uiEvent" => MetaKey::UiEvent,
            "paste" => MetaKey::Paste,
            "remote" => MetaKey::Remote,
            "rebased" => MetaKey::Rebased,
            "addToHistory" => MetaKey::AddToHistory,
            other => MetaKey::Other(other.to_owned()),
        }
    }
}

/// A change to an [`EditorState`](crate::EditorState).
///
/// Dereferences to its [`Transform`] for document changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    transform: Transform,
    before_selection: Selection,
    selection: Option<Selection>,
    before_stored_marks: Option<Vec<Mark>>,
    stored_marks: Option<Option<Vec<Mark>>>,
    meta: BTreeMap<MetaKey, Value>,
    collab: Option<CollabState>,
    scroll_into_view: bool,
}

impl Deref for Transaction {
    type Target = Transform;

    fn deref(&self) -> &Transform {
        &self.transform
    }
}

impl DerefMut for Transaction {
    fn deref_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

impl Transaction {
    pub(crate) fn new(doc: Node, selection: Selection, stored_marks: Option<Vec<Mark>>) -> Self {
        Self {
            transform: Transform::new(doc),
            before_selection: selection,
            selection: None,
            before_stored_marks: stored_marks,
            stored_marks: None,
            meta: BTreeMap::new(),
            collab: None,
            scroll_into_view: false,
        }
    }

    /// Selection the transaction started from.
    pub fn before_selection(&self) -> &Selection {
        &self.before_selection
    }

    /// The explicit selection if set, else the starting selection mapped
    /// through the steps.
    pub fn selection(&self) -> Selection {
        match &self.selection {
            Some(selection) => selection.clone(),
            None => self.before_selection.map(self.doc(), self.mapping()),
        }
    }

    pub fn selection_set(&self) -> bool {
        self.selection.is_some()
    }

    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = Some(selection);
        self.stored_marks = Some(None);
        self
    }

    /// Stored marks after this transaction. Any document or selection
    /// change clears them unless they were set explicitly.
    pub fn stored_marks(&self) -> Option<&[Mark]> {
        match &self.stored_marks {
            Some(marks) => marks.as_deref(),
            None if self.doc_changed() => None,
            None => self.before_stored_marks.as_deref(),
        }
    }

    pub fn stored_marks_set(&self) -> bool {
        self.stored_marks.is_some()
    }

    pub fn set_stored_marks(&mut self, marks: Option<Vec<Mark>>) -> &mut Self {
        self.stored_marks = Some(marks);
        self
    }

    pub fn set_meta(&mut self, key: impl Into<MetaKey>, value: Value) -> &mut Self {
        self.meta.insert(key.into(), value);
        self
    }

    pub fn meta(&self, key: &MetaKey) -> Option<&Value> {
        self.meta.get(key)
    }

    pub fn meta_keys(&self) -> impl Iterator<Item = &MetaKey> {
        self.meta.keys()
    }

    /// The `inputType` meta as a string.
    pub fn input_type(&self) -> Option<&str> {
        self.meta(&MetaKey::InputType).and_then(Value::as_str)
    }

    /// The collab state this transaction installs, if it comes from a
    /// collab receive.
    pub fn collab(&self) -> Option<&CollabState> {
        self.collab.as_ref()
    }

    pub fn set_collab(&mut self, collab: CollabState) -> &mut Self {
        self.collab = Some(collab);
        self
    }

    pub fn scroll_into_view(&mut self) -> &mut Self {
        self.scroll_into_view = true;
        self
    }

    pub fn scrolled_into_view(&self) -> bool {
        self.scroll_into_view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::*;
    use crate::{CollabState, EditorState};
    use serde_json::json;

    fn state() -> EditorState {
        EditorState::new(doc(vec![p(vec![text("abc")])]), CollabState::new(0, 1))
    }

    #[test]
    fn test_selection_maps_when_unset() {
        let state = state().with_selection(Selection::caret(3));
        let mut tr = state.tr();
        tr.insert(1, vec![text("xy")]).unwrap();
        assert!(!tr.selection_set());
        assert_eq!(tr.selection(), Selection::caret(5));
    }

    #[test]
    fn test_meta_keys() {
        let mut tr = state().tr();
        tr.set_meta(MetaKey::InputType, json!("insertText"));
        tr.set_meta("custom", json!(true));
        assert_eq!(tr.input_type(), Some("insertText"));
        assert_eq!(tr.meta(&MetaKey::Other("custom".into())), Some(&json!(true)));
        assert_eq!(MetaKey::from("uiEvent"), MetaKey::UiEvent);
        assert_eq!(MetaKey::Rebased.to_string(), "rebased");
    }

    #[test]
    fn test_stored_marks_cleared_by_change() {
        let state = EditorState::new(doc(vec![p(vec![text("abc")])]), CollabState::new(0, 1))
            .with_stored_marks(Some(vec![Mark::Bold]));
        let tr = state.tr();
        assert_eq!(tr.stored_marks(), Some(&[Mark::Bold][..]));
        let mut tr = state.tr();
        tr.delete(1, 2).unwrap();
        assert_eq!(tr.stored_marks(), None);
    }
}
