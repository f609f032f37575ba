//! Marking content as deleted, or retracting one's own pending insertions.

use quire_doc::{
    Bias, DeletionAttrs, Mappable, Mapping, Mark, MarkType, Node, NodeType, ReplaceStep, Selection,
    Step, TrackAttr, TrackKind, Transaction, Walk,
};
use tracing::debug;

use crate::{TrackDates, User};

/// Annotate `from..to` in `tr`'s document as deleted by `user`.
///
/// Content the same user inserted and nobody approved is removed for real
/// instead. The returned mapping describes those removals, in positions of
/// the document as it was when this was called.
pub(crate) fn mark_deletion(
    tr: &mut Transaction,
    from: usize,
    to: usize,
    user: &User,
    dates: &TrackDates,
) -> Mapping {
    let deletion = Mark::Deletion(DeletionAttrs {
        user: user.id.clone(),
        username: user.username.clone(),
        date: dates.mark,
    });
    let mut first_table_cell_child = false;
    let mut list_item = false;
    let mut removed = Mapping::new();
    let doc = tr.doc().clone();

    doc.nodes_between(from, to, |v| {
        let node = v.node;
        let pos = v.pos;
        let node_type = node.node_type();
        if pos < from && node_type == NodeType::TableCell {
            first_table_cell_child = true;
            return Walk::Descend;
        }
        if (pos < from && node.is_block()) || first_table_cell_child {
            first_table_cell_child = false;
            return Walk::Descend;
        }
        if matches!(node_type, NodeType::TableRow | NodeType::TableCell) {
            return Walk::Skip;
        }

        let start = removed.map(pos.max(from), Bias::After);
        let end = removed.map(to.min(pos + node.node_size()), Bias::After);

        if node.is_inline() {
            if own_pending_insertion(node, user) {
                remove_range(tr, &mut removed, start, end);
            } else if !node.has_mark(MarkType::Deletion) {
                if let Err(e) = tr.add_mark(start, end, deletion.clone()) {
                    debug!("deletion mark at {}..{} skipped: {}", start, end, e);
                }
            }
            return Walk::Descend;
        }

        if node.has_track(TrackKind::Deletion) || node_type.is_list() {
            return Walk::Descend;
        }
        let mut track = node.track();
        if track.iter().any(|t| t.kind == TrackKind::Insertion && t.user == user.id) {
            // The block is the user's own insertion: take it out again.
            let range = if node.is_textblock() && to < pos + node.node_size() {
                // Only the start of the block is deleted; merge what is left
                // into the previous text position.
                let here = removed.map(pos, Bias::After);
                Selection::find_from(tr.doc(), here, true)
                    .map(|before| (before.head(), removed.map(to, Bias::After)))
            } else {
                Some((start, end))
            };
            if let Some((a, b)) = range {
                remove_range(tr, &mut removed, a, b);
            }
            if node_type == NodeType::ListItem && list_item {
                list_item = false;
            }
        } else if node.has_track_attr() {
            if node_type == NodeType::ListItem {
                list_item = true;
            } else if list_item {
                // First child of a deleted list item: it is not joined with
                // the block before it, so it gets no entry of its own.
                list_item = false;
                return Walk::Descend;
            }
            track.push(TrackAttr::new(TrackKind::Deletion, &user.id, &user.username, dates.block));
            let at = removed.map(pos, Bias::After);
            if let Err(e) = tr.set_track(at, &track) {
                debug!("deletion track at {} skipped: {}", at, e);
            }
        }

        if node_type == NodeType::Figure {
            Walk::Skip
        } else {
            Walk::Descend
        }
    });

    removed
}

fn own_pending_insertion(node: &Node, user: &User) -> bool {
    node.marks()
        .iter()
        .any(|m| matches!(m, Mark::Insertion(attrs) if attrs.user == user.id && !attrs.approved))
}

/// Delete `from..to` for real and record the change in `removed`.
fn remove_range(tr: &mut Transaction, removed: &mut Mapping, from: usize, to: usize) {
    let step = Step::Replace(ReplaceStep::delete(from, to));
    let map = step.get_map();
    match tr.step(step) {
        Ok(()) => removed.append_map(map, None),
        Err(e) => debug!("retraction of {}..{} failed: {}", from, to, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use quire_doc::build::*;
    use quire_doc::{CollabState, EditorState, InsertionAttrs};

    fn user() -> User {
        User::new("u1", "Ann")
    }

    fn dates() -> TrackDates {
        TrackDates::new(DateTime::parse_from_rfc3339("2024-05-01T10:27:00Z").unwrap().with_timezone(&Utc))
    }

    fn inserted_by(id: &str) -> Mark {
        Mark::Insertion(InsertionAttrs {
            user: id.into(),
            username: id.into(),
            date: dates().mark,
            approved: false,
        })
    }

    fn state(d: Node) -> EditorState {
        EditorState::new(d, CollabState::new(0, 1))
    }

    #[test]
    fn test_marks_text_deleted() {
        let st = state(doc(vec![p(vec![text("abcd")])]));
        let mut tr = st.tr();
        let map = mark_deletion(&mut tr, 2, 4, &user(), &dates());
        assert!(map.is_empty());
        assert_eq!(tr.doc().text_content(), "abcd");
        assert!(tr.doc().child(0).child(1).has_mark(MarkType::Deletion));
    }

    #[test]
    fn test_retracts_own_insertion() {
        let st = state(doc(vec![p(vec![text("ab"), marked("XY", vec![inserted_by("u1")]), text("cd")])]));
        let mut tr = st.tr();
        let map = mark_deletion(&mut tr, 2, 7, &user(), &dates());
        // "XY" is gone, everything after "a" carries a deletion mark.
        assert_eq!(tr.doc().text_content(), "abcd");
        assert_eq!(map.map(7, Bias::After), 5);
        let para = tr.doc().child(0);
        assert_eq!(para.child(0).text_str(), Some("a"));
        assert!(para.content().iter().skip(1).all(|n| n.has_mark(MarkType::Deletion)));
    }

    #[test]
    fn test_others_insertion_is_marked() {
        let st = state(doc(vec![p(vec![marked("XY", vec![inserted_by("u2")])])]));
        let mut tr = st.tr();
        mark_deletion(&mut tr, 1, 3, &user(), &dates());
        let node = tr.doc().child(0).child(0);
        assert_eq!(node.text_str(), Some("XY"));
        assert!(node.has_mark(MarkType::Deletion));
        assert!(node.has_mark(MarkType::Insertion));
    }

    #[test]
    fn test_block_boundary_gets_deletion_track() {
        let st = state(doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]));
        let mut tr = st.tr();
        mark_deletion(&mut tr, 3, 5, &user(), &dates());
        let second = tr.doc().child(1);
        assert!(second.has_track(TrackKind::Deletion));
        assert!(!tr.doc().child(0).has_track(TrackKind::Deletion));
    }

    #[test]
    fn test_retracts_own_inserted_paragraph() {
        let own = TrackAttr::new(TrackKind::Insertion, "u1", "Ann", dates().block);
        let mut second = p(vec![text("cd")]);
        let mut attrs = second.attrs().clone();
        attrs.insert("track".into(), serde_json::to_value(vec![own]).unwrap());
        second = second.with_attrs(attrs);
        let st = state(doc(vec![p(vec![text("ab")]), second]));
        let mut tr = st.tr();
        // Backspace at the start of the inserted paragraph.
        mark_deletion(&mut tr, 3, 5, &user(), &dates());
        assert_eq!(tr.doc().child_count(), 1);
        assert_eq!(tr.doc().child(0).text_content(), "abcd");
    }
}
