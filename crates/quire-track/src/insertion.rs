//! Marking content as inserted.

use quire_doc::{
    InsertionAttrs, Mark, MarkType, Node, NodeType, TrackAttr, TrackKind, Transaction, Walk,
};
use tracing::debug;

use crate::{TrackDates, User};

/// Annotate everything between `from` and `to` in `tr`'s document as
/// inserted by `user`.
///
/// Inline nodes get a fresh insertion mark (replacing any insertion or
/// deletion mark). Blocks with a `track` attribute get a single insertion
/// entry, or none when `approved`. Lists are descended into; table rows and
/// cells are left alone, and nothing inside an inserted figure or table is
/// annotated separately.
pub(crate) fn mark_insertion(
    tr: &mut Transaction,
    from: usize,
    to: usize,
    user: &User,
    dates: &TrackDates,
    approved: bool,
) {
    let insertion = Mark::Insertion(InsertionAttrs {
        user: user.id.clone(),
        username: user.username.clone(),
        date: dates.mark,
        approved,
    });
    let doc = tr.doc().clone();
    doc.nodes_between(from, to, |v| {
        let node = v.node;
        if node.is_inline() {
            if already_inserted(node, user, approved) {
                return Walk::Skip;
            }
            let start = v.pos.max(from);
            let end = (v.pos + node.node_size()).min(to);
            let marked = tr
                .remove_mark(start, end, MarkType::Deletion)
                .and_then(|_| tr.remove_mark(start, end, MarkType::Insertion))
                .and_then(|_| tr.add_mark(start, end, insertion.clone()));
            if let Err(e) = marked {
                debug!("insertion mark at {}..{} skipped: {}", start, end, e);
            }
            return Walk::Skip;
        }
        let node_type = node.node_type();
        if v.pos < from || node_type.is_list() {
            return Walk::Descend;
        }
        if matches!(node_type, NodeType::TableRow | NodeType::TableCell) {
            return Walk::Skip;
        }
        if node.has_track_attr() {
            let track = if approved {
                Vec::new()
            } else {
                vec![TrackAttr::new(TrackKind::Insertion, &user.id, &user.username, dates.block)]
            };
            if let Err(e) = tr.set_track(v.pos, &track) {
                debug!("insertion track at {} skipped: {}", v.pos, e);
            }
        }
        if matches!(node_type, NodeType::Figure | NodeType::Table) {
            Walk::Skip
        } else {
            Walk::Descend
        }
    });
}

/// Already carries this user's insertion mark in the same approval state
/// and is not marked deleted.
fn already_inserted(node: &Node, user: &User, approved: bool) -> bool {
    let inserted = node.marks().iter().any(|m| {
        matches!(m, Mark::Insertion(attrs) if attrs.user == user.id && attrs.approved == approved)
    });
    inserted && !node.has_mark(MarkType::Deletion)
}
