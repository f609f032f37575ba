//! Accepting and rejecting tracked changes produced by real edits.

use chrono::{DateTime, TimeZone, Utc};
use quire_doc::build::*;
use quire_doc::{
    CollabState, EditorState, Mark, MarkType, MetaKey, Node, NodeType, Selection, TrackKind,
};
use quire_track::{
    User, accept_all, accept_all_no_insertions, accept_changes, amend_transaction, has_changes,
    reject_all,
};
use serde_json::json;

// ============================================================================
// Helpers
// ============================================================================

fn ann() -> User {
    User::new("u1", "Ann")
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

fn state(doc: Node) -> EditorState {
    EditorState::new(doc, CollabState::new(0, 1)).with_selection(Selection::caret(1))
}

fn edit(state: &EditorState, f: impl FnOnce(&mut quire_doc::Transaction)) -> EditorState {
    let mut tr = state.tr();
    f(&mut tr);
    tr.set_meta(MetaKey::InputType, json!("insertText"));
    let amended = amend_transaction(tr, state, &ann(), true, now());
    state.apply(&amended)
}

/// "ab" / "cd" with "b", the paragraph boundary and "c" deleted.
fn deleted_across_blocks() -> Node {
    let s = state(doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]));
    let s = edit(&s, |tr| tr.delete(2, 6).unwrap());
    s.doc().clone()
}

fn typed_x() -> Node {
    let s = state(doc(vec![p(vec![text("hello")])]));
    let s = edit(&s, |tr| tr.insert(6, vec![text("X")]).unwrap());
    s.doc().clone()
}

// ============================================================================
// Deletions
// ============================================================================

#[test]
fn test_tracked_deletion_shape() {
    let d = deleted_across_blocks();
    assert_eq!(d.child_count(), 2);
    assert!(d.child(0).child(1).has_mark(MarkType::Deletion));
    assert!(d.child(1).has_track(TrackKind::Deletion));
    assert!(d.child(1).child(0).has_mark(MarkType::Deletion));
    assert!(has_changes(&d));
}

#[test]
fn test_accept_deletion_removes_content() {
    let accepted = accept_all(&deleted_across_blocks()).unwrap();
    assert_eq!(accepted, doc(vec![p(vec![text("ad")])]));
    assert!(!has_changes(&accepted));
}

#[test]
fn test_reject_deletion_restores_original() {
    let rejected = reject_all(&deleted_across_blocks()).unwrap();
    assert_eq!(rejected, doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]));
}

// ============================================================================
// Insertions
// ============================================================================

#[test]
fn test_accept_insertion_keeps_text() {
    let accepted = accept_all(&typed_x()).unwrap();
    assert_eq!(accepted, doc(vec![p(vec![text("helloX")])]));
}

#[test]
fn test_reject_insertion_removes_text() {
    let rejected = reject_all(&typed_x()).unwrap();
    assert_eq!(rejected, doc(vec![p(vec![text("hello")])]));
}

#[test]
fn test_export_leaves_insertions() {
    let exported = accept_all_no_insertions(&typed_x()).unwrap();
    let inserted = exported.child(0).child(1);
    assert!(inserted.has_mark(MarkType::Insertion));
}

#[test]
fn test_accept_only_requested_kinds() {
    let d = typed_x();
    let unchanged = accept_changes(&d, 0, d.content_size(), &[TrackKind::Deletion]).unwrap();
    assert_eq!(unchanged, d);
}

// ============================================================================
// Formatting and block changes
// ============================================================================

#[test]
fn test_reject_format_change_restores_marks() {
    let s = state(doc(vec![p(vec![marked("abc", vec![Mark::Italic])])]));
    let s = edit(&s, |tr| {
        tr.remove_mark(1, 4, MarkType::Italic).unwrap();
        tr.add_mark(1, 4, Mark::Bold).unwrap();
    });
    let rejected = reject_all(s.doc()).unwrap();
    assert_eq!(rejected, doc(vec![p(vec![marked("abc", vec![Mark::Italic])])]));

    let accepted = accept_all(s.doc()).unwrap();
    assert_eq!(accepted, doc(vec![p(vec![marked("abc", vec![Mark::Bold])])]));
}

#[test]
fn test_block_change_review() {
    let s = state(doc(vec![p(vec![text("hello")])]));
    let s = edit(&s, |tr| {
        let mut attrs = NodeType::Heading.default_attrs();
        attrs.insert("level".into(), json!(2));
        tr.set_node_markup(0, NodeType::Heading, attrs).unwrap();
    });

    let rejected = reject_all(s.doc()).unwrap();
    assert_eq!(rejected, doc(vec![p(vec![text("hello")])]));

    let accepted = accept_all(s.doc()).unwrap();
    assert_eq!(accepted, doc(vec![h(2, vec![text("hello")])]));
}
