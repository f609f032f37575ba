//! Local edits run through `amend_transaction` the way the editor does
//! before dispatching them.

use chrono::{DateTime, TimeZone, Utc};
use quire_doc::build::*;
use quire_doc::{
    CollabState, EditorState, Mark, MarkType, MetaKey, Node, NodeType, ReplaceAroundStep,
    Selection, Slice, Step, TrackKind, Transaction,
};
use quire_track::{User, amend_transaction, has_changes};
use serde_json::json;

// ============================================================================
// Helpers
// ============================================================================

fn ann() -> User {
    User::new("u1", "Ann")
}

fn bob() -> User {
    User::new("u2", "Bob")
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 27, 42).unwrap()
}

fn state(doc: Node, caret: usize) -> EditorState {
    EditorState::new(doc, CollabState::new(0, 1)).with_selection(Selection::caret(caret))
}

/// Run `tr` through tracking as `user` and apply the result.
fn commit(state: &EditorState, tr: Transaction, user: &User, tracking: bool) -> EditorState {
    let amended = amend_transaction(tr, state, user, tracking, now());
    state.apply(&amended)
}

fn typed(state: &EditorState, pos: usize, s: &str) -> Transaction {
    let mut tr = state.tr();
    tr.insert(pos, vec![text(s)]).unwrap();
    tr.set_meta(MetaKey::InputType, json!("insertText"));
    tr.set_selection(Selection::caret(pos + s.chars().count()));
    tr
}

fn insertion_by(node: &Node, user: &User) -> bool {
    node.marks()
        .iter()
        .any(|m| matches!(m, Mark::Insertion(a) if a.user == user.id && !a.approved))
}

// ============================================================================
// Pass-through
// ============================================================================

#[test]
fn test_remote_transaction_untouched() {
    let s = state(doc(vec![p(vec![text("hello")])]), 6);
    let mut tr = typed(&s, 6, "!");
    tr.set_meta(MetaKey::Remote, json!(true));
    let amended = amend_transaction(tr.clone(), &s, &ann(), true, now());
    assert_eq!(amended, tr);
}

#[test]
fn test_history_transaction_untouched() {
    let s = state(doc(vec![p(vec![text("hello")])]), 6);
    let mut tr = typed(&s, 6, "!");
    tr.set_meta(MetaKey::InputType, json!("historyUndo"));
    let amended = amend_transaction(tr.clone(), &s, &ann(), true, now());
    assert_eq!(amended, tr);
}

#[test]
fn test_selection_change_untouched() {
    let s = state(doc(vec![p(vec![text("hello")])]), 1);
    let mut tr = s.tr();
    tr.set_selection(Selection::text(1, 4));
    let amended = amend_transaction(tr.clone(), &s, &ann(), true, now());
    assert_eq!(amended, tr);
}

// ============================================================================
// Insertions
// ============================================================================

#[test]
fn test_typing_is_marked_inserted() {
    let s = state(doc(vec![p(vec![text("hello")])]), 6);
    let next = commit(&s, typed(&s, 6, "X"), &ann(), true);

    assert_eq!(next.doc().text_content(), "helloX");
    let para = next.doc().child(0);
    assert_eq!(para.child(0).text_str(), Some("hello"));
    assert!(insertion_by(para.child(1), &ann()));
    assert_eq!(next.selection(), &Selection::caret(7));
}

#[test]
fn test_insertion_date_rounded_to_ten_minutes() {
    let s = state(doc(vec![p(vec![text("hello")])]), 6);
    let next = commit(&s, typed(&s, 6, "X"), &ann(), true);

    let inserted = next.doc().child(0).child(1);
    match &inserted.marks()[0] {
        Mark::Insertion(a) => {
            assert_eq!(a.date, Utc.with_ymd_and_hms(2024, 5, 1, 10, 20, 0).unwrap());
        }
        other => panic!("expected insertion, got {:?}", other),
    }
}

#[test]
fn test_continued_typing_extends_insertion() {
    let s = state(doc(vec![p(vec![text("hello")])]), 6);
    let s = commit(&s, typed(&s, 6, "X"), &ann(), true);
    let s = commit(&s, typed(&s, 7, "Y"), &ann(), true);

    let para = s.doc().child(0);
    assert_eq!(para.child_count(), 2);
    assert_eq!(para.child(1).text_str(), Some("XY"));
    assert!(insertion_by(para.child(1), &ann()));
}

#[test]
fn test_untracked_typing_is_approved() {
    let s = state(doc(vec![p(vec![text("hello")])]), 6);
    let next = commit(&s, typed(&s, 6, "X"), &ann(), false);

    let inserted = next.doc().child(0).child(1);
    assert!(matches!(&inserted.marks()[0], Mark::Insertion(a) if a.approved));
    assert!(!has_changes(next.doc()));
}

#[test]
fn test_reamending_tracked_insertion_is_stable() {
    let s = state(doc(vec![p(vec![text("hello")])]), 6);
    let amended = amend_transaction(typed(&s, 6, "X"), &s, &ann(), true, now());
    let again = amend_transaction(amended.clone(), &s, &ann(), true, now());

    assert_eq!(s.apply(&again).doc(), s.apply(&amended).doc());
}

// ============================================================================
// Deletions
// ============================================================================

#[test]
fn test_deletion_keeps_text() {
    let s = state(doc(vec![p(vec![text("hello")])]), 4);
    let mut tr = s.tr();
    tr.delete(2, 4).unwrap();
    tr.set_meta(MetaKey::InputType, json!("deleteContentBackward"));
    tr.set_selection(Selection::caret(2));
    let next = commit(&s, tr, &ann(), true);

    assert_eq!(next.doc().text_content(), "hello");
    let para = next.doc().child(0);
    assert_eq!(para.child(1).text_str(), Some("el"));
    assert!(para.child(1).has_mark(MarkType::Deletion));
    assert_eq!(next.selection(), &Selection::caret(2));
}

#[test]
fn test_deleting_own_insertion_retracts_it() {
    let s = state(doc(vec![p(vec![text("hello")])]), 6);
    let s = commit(&s, typed(&s, 6, "X"), &ann(), true);

    let mut tr = s.tr();
    tr.delete(6, 7).unwrap();
    tr.set_meta(MetaKey::InputType, json!("deleteContentBackward"));
    let next = commit(&s, tr, &ann(), true);

    assert_eq!(next.doc(), &doc(vec![p(vec![text("hello")])]));
    assert!(!has_changes(next.doc()));
}

#[test]
fn test_deleting_others_insertion_marks_it() {
    let s = state(doc(vec![p(vec![text("hello")])]), 6);
    let s = commit(&s, typed(&s, 6, "X"), &ann(), true);

    let mut tr = s.tr();
    tr.delete(6, 7).unwrap();
    let next = commit(&s, tr, &bob(), true);

    let inserted = next.doc().child(0).child(1);
    assert_eq!(inserted.text_str(), Some("X"));
    assert!(inserted.has_mark(MarkType::Deletion));
}

#[test]
fn test_replacing_selection_keeps_old_text() {
    let s = state(doc(vec![p(vec![text("cat")])]), 1).with_selection(Selection::text(1, 4));
    let mut tr = s.tr();
    tr.replace(1, 4, quire_doc::Slice::closed(vec![text("dog")])).unwrap();
    tr.set_meta(MetaKey::InputType, json!("insertText"));
    let next = commit(&s, tr, &ann(), true);

    assert_eq!(next.doc().text_content(), "catdog");
    let para = next.doc().child(0);
    assert!(para.child(0).has_mark(MarkType::Deletion));
    assert!(insertion_by(para.child(1), &ann()));
}

// ============================================================================
// Formatting
// ============================================================================

#[test]
fn test_bold_records_format_change() {
    let s = state(doc(vec![p(vec![text("abc")])]), 1);
    let mut tr = s.tr();
    tr.add_mark(1, 4, Mark::Bold).unwrap();
    let next = commit(&s, tr, &ann(), true);

    let node = next.doc().child(0).child(0);
    assert!(node.has_mark(MarkType::Bold));
    match node.marks().iter().find(|m| m.mark_type() == MarkType::FormatChange) {
        Some(Mark::FormatChange(fc)) => {
            assert!(fc.before.is_empty());
            assert_eq!(fc.after, vec![MarkType::Bold]);
        }
        other => panic!("expected format change, got {:?}", other),
    }
}

#[test]
fn test_undoing_format_change_leaves_plain_text() {
    let s = state(doc(vec![p(vec![text("abc")])]), 1);
    let mut tr = s.tr();
    tr.add_mark(1, 4, Mark::Bold).unwrap();
    let s = commit(&s, tr, &ann(), true);

    let mut tr = s.tr();
    tr.remove_mark(1, 4, MarkType::Bold).unwrap();
    let s = commit(&s, tr, &ann(), true);

    assert_eq!(s.doc(), &doc(vec![p(vec![text("abc")])]));
}

#[test]
fn test_untracked_bold_applied_as_is() {
    let s = state(doc(vec![p(vec![text("abc")])]), 1);
    let mut tr = s.tr();
    tr.add_mark(1, 4, Mark::Bold).unwrap();
    let next = commit(&s, tr, &ann(), false);

    assert_eq!(next.doc(), &doc(vec![p(vec![marked("abc", vec![Mark::Bold])])]));
}

// ============================================================================
// Block changes
// ============================================================================

#[test]
fn test_heading_records_block_change() {
    let s = state(doc(vec![p(vec![text("hello")])]), 1);
    let mut tr = s.tr();
    let mut attrs = NodeType::Heading.default_attrs();
    attrs.insert("level".into(), json!(2));
    tr.set_node_markup(0, NodeType::Heading, attrs).unwrap();
    let next = commit(&s, tr, &ann(), true);

    let block = next.doc().child(0);
    assert_eq!(block.node_type(), NodeType::Heading);
    let track = block.track();
    assert_eq!(track.len(), 1);
    assert_eq!(track[0].kind, TrackKind::BlockChange);
    let before = track[0].before.as_ref().unwrap();
    assert_eq!(before.node_type, NodeType::Paragraph);
    assert!(before.attrs.is_empty());
}

#[test]
fn test_changing_block_back_drops_block_change() {
    let s = state(doc(vec![p(vec![text("hello")])]), 1);
    let mut tr = s.tr();
    let mut attrs = NodeType::Heading.default_attrs();
    attrs.insert("level".into(), json!(2));
    tr.set_node_markup(0, NodeType::Heading, attrs).unwrap();
    let s = commit(&s, tr, &ann(), true);

    let mut tr = s.tr();
    tr.set_node_markup(0, NodeType::Paragraph, NodeType::Paragraph.default_attrs()).unwrap();
    let s = commit(&s, tr, &ann(), true);

    assert_eq!(s.doc(), &doc(vec![p(vec![text("hello")])]));
}

#[test]
fn test_wrapping_marks_wrapper_inserted() {
    let s = state(doc(vec![p(vec![text("hello")])]), 1);
    let mut tr = s.tr();
    tr.step(Step::ReplaceAround(ReplaceAroundStep {
        from: 0,
        to: 7,
        gap_from: 0,
        gap_to: 7,
        slice: Slice::closed(vec![blockquote(vec![])]),
        insert: 1,
        structure: true,
    }))
    .unwrap();
    let next = commit(&s, tr, &ann(), true);

    let quote = next.doc().child(0);
    assert_eq!(quote.node_type(), NodeType::Blockquote);
    assert!(quote.has_track(TrackKind::Insertion));
    assert!(quote.child(0).track().is_empty());
    assert_eq!(next.doc().text_content(), "hello");
}

#[test]
fn test_unwrapping_keeps_wrapper_as_deleted() {
    let s = state(doc(vec![blockquote(vec![p(vec![text("hello")])])]), 2);
    let mut tr = s.tr();
    tr.step(Step::ReplaceAround(ReplaceAroundStep {
        from: 0,
        to: 9,
        gap_from: 1,
        gap_to: 8,
        slice: Slice::empty(),
        insert: 0,
        structure: true,
    }))
    .unwrap();
    let next = commit(&s, tr, &bob(), true);

    let quote = next.doc().child(0);
    assert_eq!(quote.node_type(), NodeType::Blockquote);
    assert!(quote.has_track(TrackKind::Deletion));
    assert_eq!(quote.child(0).text_content(), "hello");
}

#[test]
fn test_attribute_change_applied_as_is() {
    let s = state(doc(vec![h(1, vec![text("title")])]), 1);
    let mut tr = s.tr();
    tr.set_node_attr(0, "level", json!(2)).unwrap();
    let next = commit(&s, tr, &ann(), true);

    assert_eq!(next.doc(), &doc(vec![h(2, vec![text("title")])]));
    assert!(next.doc().child(0).track().is_empty());
}
