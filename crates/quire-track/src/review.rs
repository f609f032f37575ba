//! Accepting and rejecting tracked changes.
//!
//! Each operation walks the original document once, collecting edits in
//! document order, then applies them through a [`Transform`] with positions
//! mapped through the edits already made.

use quire_doc::{
    Attrs, Bias, FormatChangeAttrs, Mappable, Mark, MarkType, Node, NodeType, StepError, TRACK_ATTR,
    TrackAttr, TrackKind, Transform, Walk,
};

/// Which way a change is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Keep the change, drop the annotation.
    Accept,
    /// Undo the change, drop the annotation.
    Reject,
}

/// All change categories.
pub const ALL_CHANGES: [TrackKind; 4] =
    [TrackKind::Insertion, TrackKind::Deletion, TrackKind::FormatChange, TrackKind::BlockChange];

/// Accept every change in the document.
pub fn accept_all(doc: &Node) -> Result<Node, StepError> {
    accept_changes(doc, 0, doc.content_size(), &ALL_CHANGES)
}

/// Reject every change in the document.
pub fn reject_all(doc: &Node) -> Result<Node, StepError> {
    reject_changes(doc, 0, doc.content_size(), &ALL_CHANGES)
}

/// The document as exported: deletions applied, format and block changes
/// accepted, insertions left annotated.
pub fn accept_all_no_insertions(doc: &Node) -> Result<Node, StepError> {
    accept_changes(
        doc,
        0,
        doc.content_size(),
        &[TrackKind::Deletion, TrackKind::FormatChange, TrackKind::BlockChange],
    )
}

/// Accept changes of the given kinds between `from` and `to`.
pub fn accept_changes(
    doc: &Node,
    from: usize,
    to: usize,
    kinds: &[TrackKind],
) -> Result<Node, StepError> {
    resolve(doc, from, to, kinds, Resolution::Accept)
}

/// Reject changes of the given kinds between `from` and `to`.
pub fn reject_changes(
    doc: &Node,
    from: usize,
    to: usize,
    kinds: &[TrackKind],
) -> Result<Node, StepError> {
    resolve(doc, from, to, kinds, Resolution::Reject)
}

/// One edit, in positions of the original document.
#[derive(Debug)]
enum Edit {
    AddMark { from: usize, to: usize, mark: Mark },
    RemoveMark { from: usize, to: usize, mark: Mark },
    Delete { from: usize, to: usize },
    /// Join the block starting at `pos` onto the block before it.
    Join { pos: usize },
    SetTrack { pos: usize, track: Vec<TrackAttr> },
    Restore { pos: usize, node_type: NodeType, attrs: Attrs },
}

/// Accept or reject changes of the given kinds between `from` and `to`.
pub fn resolve(
    doc: &Node,
    from: usize,
    to: usize,
    kinds: &[TrackKind],
    resolution: Resolution,
) -> Result<Node, StepError> {
    let edits = collect(doc, from, to, kinds, resolution);
    let mut tr = Transform::new(doc.clone());
    for edit in edits {
        let map = |tr: &Transform, pos: usize, bias: Bias| tr.mapping().map(pos, bias);
        match edit {
            Edit::AddMark { from, to, mark } => {
                let (a, b) = (map(&tr, from, Bias::After), map(&tr, to, Bias::Before));
                if a < b {
                    tr.add_mark(a, b, mark)?;
                }
            }
            Edit::RemoveMark { from, to, mark } => {
                let (a, b) = (map(&tr, from, Bias::After), map(&tr, to, Bias::Before));
                if a < b {
                    tr.remove_mark(a, b, mark)?;
                }
            }
            Edit::Delete { from, to } => {
                let (a, b) = (map(&tr, from, Bias::After), map(&tr, to, Bias::Before));
                if a < b {
                    tr.delete(a, b)?;
                }
            }
            Edit::Join { pos } => {
                let at = map(&tr, pos, Bias::After);
                if at > 0 {
                    tr.delete(at - 1, at + 1)?;
                }
            }
            Edit::SetTrack { pos, track } => {
                let at = map(&tr, pos, Bias::After);
                tr.set_track(at, &track)?;
            }
            Edit::Restore { pos, node_type, attrs } => {
                let at = map(&tr, pos, Bias::After);
                tr.set_node_markup(at, node_type, attrs)?;
            }
        }
    }
    Ok(tr.doc().clone())
}

fn collect(
    doc: &Node,
    from: usize,
    to: usize,
    kinds: &[TrackKind],
    resolution: Resolution,
) -> Vec<Edit> {
    let wants = |kind: TrackKind| kinds.contains(&kind);
    let mut edits = Vec::new();
    doc.nodes_between(from, to, |v| {
        let node = v.node;
        if node.is_inline() {
            let start = v.pos.max(from);
            let end = (v.pos + node.node_size()).min(to);
            inline_edits(node, start, end, &wants, resolution, &mut edits);
            return Walk::Skip;
        }
        if v.pos < from || !node.has_track_attr() {
            return Walk::Descend;
        }
        block_edits(v.node, v.pos, v.index, v.parent, &wants, resolution, &mut edits)
    });
    edits
}

fn inline_edits(
    node: &Node,
    start: usize,
    end: usize,
    wants: &impl Fn(TrackKind) -> bool,
    resolution: Resolution,
    edits: &mut Vec<Edit>,
) {
    use Resolution::{Accept, Reject};

    for mark in node.marks() {
        match (mark, resolution) {
            (Mark::Insertion(attrs), Accept) if wants(TrackKind::Insertion) && !attrs.approved => {
                edits.push(Edit::RemoveMark { from: start, to: end, mark: mark.clone() });
            }
            (Mark::Insertion(attrs), Reject) if wants(TrackKind::Insertion) && !attrs.approved => {
                edits.push(Edit::Delete { from: start, to: end });
                return;
            }
            (Mark::Deletion(_), Accept) if wants(TrackKind::Deletion) => {
                edits.push(Edit::Delete { from: start, to: end });
                return;
            }
            (Mark::Deletion(_), Reject) if wants(TrackKind::Deletion) => {
                edits.push(Edit::RemoveMark { from: start, to: end, mark: mark.clone() });
            }
            (Mark::FormatChange(attrs), _) if wants(TrackKind::FormatChange) => {
                if resolution == Reject {
                    revert_format(attrs, start, end, edits);
                }
                edits.push(Edit::RemoveMark { from: start, to: end, mark: mark.clone() });
            }
            _ => {}
        }
    }
}

/// Remove the marks a format change added and restore those it removed.
fn revert_format(attrs: &FormatChangeAttrs, start: usize, end: usize, edits: &mut Vec<Edit>) {
    for mark_type in &attrs.after {
        if let Some(mark) = Mark::simple(*mark_type) {
            edits.push(Edit::RemoveMark { from: start, to: end, mark });
        }
    }
    for mark_type in &attrs.before {
        if let Some(mark) = Mark::simple(*mark_type) {
            edits.push(Edit::AddMark { from: start, to: end, mark });
        }
    }
}

fn block_edits(
    node: &Node,
    pos: usize,
    index: usize,
    parent: &Node,
    wants: &impl Fn(TrackKind) -> bool,
    resolution: Resolution,
    edits: &mut Vec<Edit>,
) -> Walk {
    let track = node.track();
    let (resolved, kept): (Vec<TrackAttr>, Vec<TrackAttr>) =
        track.into_iter().partition(|t| wants(t.kind));
    if resolved.is_empty() {
        return Walk::Descend;
    }
    let removes_block = resolved.iter().any(|t| {
        matches!(
            (t.kind, resolution),
            (TrackKind::Deletion, Resolution::Accept) | (TrackKind::Insertion, Resolution::Reject)
        )
    });
    if removes_block {
        let joins = node.is_textblock()
            && index > 0
            && parent.maybe_child(index - 1).is_some_and(Node::is_textblock);
        if joins {
            // The block boundary was the change; merge the text back.
            edits.push(Edit::SetTrack { pos, track: kept });
            edits.push(Edit::Join { pos });
            return Walk::Descend;
        }
        if node.is_textblock() || fully_inserted(node) || resolution == Resolution::Accept {
            edits.push(Edit::Delete { from: pos, to: pos + node.node_size() });
            return Walk::Skip;
        }
    }
    let restore = (resolution == Resolution::Reject)
        .then(|| resolved.iter().find(|t| t.kind == TrackKind::BlockChange))
        .flatten()
        .and_then(|t| t.before.as_ref());
    match restore {
        Some(before) => {
            let mut attrs = before.attrs.clone();
            if let Ok(track) = serde_json::to_value(&kept) {
                attrs.insert(TRACK_ATTR.into(), track);
            }
            edits.push(Edit::Restore { pos, node_type: before.node_type, attrs });
        }
        None => edits.push(Edit::SetTrack { pos, track: kept }),
    }
    Walk::Descend
}

/// Every inline descendant is an unapproved insertion.
fn fully_inserted(node: &Node) -> bool {
    let mut all = true;
    node.descendants(|v| {
        if v.node.is_inline() {
            let inserted = v
                .node
                .marks()
                .iter()
                .any(|m| matches!(m, Mark::Insertion(attrs) if !attrs.approved));
            if !inserted {
                all = false;
                return Walk::Stop;
            }
        }
        Walk::Descend
    });
    all
}

/// Whether the document still carries any annotation.
pub fn has_changes(doc: &Node) -> bool {
    let mut found = false;
    doc.descendants(|v| {
        let annotated = v.node.marks().iter().any(|m| {
            matches!(m.mark_type(), MarkType::Deletion | MarkType::FormatChange)
                || matches!(m, Mark::Insertion(attrs) if !attrs.approved)
        }) || !v.node.track().is_empty();
        if annotated {
            found = true;
            Walk::Stop
        } else {
            Walk::Descend
        }
    });
    found
}
