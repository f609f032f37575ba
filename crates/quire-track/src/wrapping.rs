//! Recording block type changes.

use quire_doc::{BlockState, Node, TRACK_ATTR, TrackAttr, TrackKind, Transaction};
use tracing::debug;

use crate::{TrackDates, User};

/// Record that the block at `pos` changed from `old_node`'s type to
/// `new_node`'s.
///
/// The first change stores the original type and attributes as the
/// `block_change` entry's `before`. Later changes keep that `before`; a
/// change back to it (same type and heading level) drops the entry.
pub(crate) fn mark_wrapping(
    tr: &mut Transaction,
    pos: usize,
    old_node: &Node,
    new_node: &Node,
    user: &User,
    dates: &TrackDates,
) {
    let mut track = old_node.track();
    match track.iter().position(|t| t.kind == TrackKind::BlockChange) {
        Some(index) => {
            let before = track.remove(index).before;
            let reverted = before.as_ref().is_some_and(|b| {
                b.node_type == new_node.node_type() && b.attrs.get("level") == new_node.attr("level")
            });
            if !reverted {
                let mut entry =
                    TrackAttr::new(TrackKind::BlockChange, &user.id, &user.username, dates.block);
                entry.before = before;
                track.push(entry);
            }
        }
        None => {
            let mut attrs = old_node.attrs().clone();
            attrs.remove("id");
            attrs.remove(TRACK_ATTR);
            let before = BlockState { node_type: old_node.node_type(), attrs };
            track.push(
                TrackAttr::new(TrackKind::BlockChange, &user.id, &user.username, dates.block)
                    .with_before(before),
            );
        }
    }
    if tr.doc().node_at(pos).is_some() {
        if let Err(e) = tr.set_track(pos, &track) {
            debug!("block change track at {} skipped: {}", pos, e);
        }
    }
}
