//! The replace algorithm: put a slice into a range of a document, joining
//! the slice's open sides with the nodes around the range.

use crate::fragment::push_joined;
use crate::{Fragment, ModelError, Node, ResolvedPos, Slice};

pub(crate) fn replace(
    from: &ResolvedPos<'_>,
    to: &ResolvedPos<'_>,
    slice: &Slice,
) -> Result<Node, ModelError> {
    if slice.open_start() > from.depth() {
        return Err(ModelError::SliceTooDeep);
    }
    if to.depth() < slice.open_end()
        || from.depth() - slice.open_start() != to.depth() - slice.open_end()
    {
        return Err(ModelError::InconsistentOpenDepths);
    }
    replace_outer(from, to, slice, 0)
}

fn replace_outer(
    from: &ResolvedPos<'_>,
    to: &ResolvedPos<'_>,
    slice: &Slice,
    depth: usize,
) -> Result<Node, ModelError> {
    let index = from.index(depth);
    let node = from.node(depth);
    if index == to.index(depth) && depth < from.depth() - slice.open_start() {
        let inner = replace_outer(from, to, slice, depth + 1)?;
        Ok(node.copy(node.content().replace_child(index, inner)))
    } else if slice.content().size() == 0 {
        close(node, replace_two_way(from, to, depth)?)
    } else if slice.open_start() == 0
        && slice.open_end() == 0
        && from.depth() == depth
        && to.depth() == depth
    {
        let parent = from.parent();
        let content = parent.content();
        let joined = content
            .cut(0, from.parent_offset())
            .append(slice.content())
            .append(&content.cut(to.parent_offset(), content.size()));
        close(parent, joined)
    } else {
        let (prepared, start_pos, end_pos) = prepare_slice_for_replace(slice, from);
        let start = prepared.resolve(start_pos)?;
        let end = prepared.resolve(end_pos)?;
        close(node, replace_three_way(from, &start, &end, to, depth)?)
    }
}

fn check_join(main: &Node, sub: &Node) -> Result<(), ModelError> {
    if sub.node_type().compatible_content(main.node_type()) {
        Ok(())
    } else {
        Err(ModelError::CannotJoin { main: main.node_type(), sub: sub.node_type() })
    }
}

fn joinable<'a>(
    before: &ResolvedPos<'a>,
    after: &ResolvedPos<'_>,
    depth: usize,
) -> Result<&'a Node, ModelError> {
    let node = before.node(depth);
    check_join(node, after.node(depth))?;
    Ok(node)
}

fn add_range(
    start: Option<&ResolvedPos<'_>>,
    end: Option<&ResolvedPos<'_>>,
    depth: usize,
    target: &mut Vec<Node>,
) {
    let node = match (start, end) {
        (_, Some(end)) => end.node(depth),
        (Some(start), None) => start.node(depth),
        (None, None) => return,
    };
    let end_index = end.map_or(node.child_count(), |e| e.index(depth));
    let mut start_index = 0;
    if let Some(start) = start {
        start_index = start.index(depth);
        if start.depth() > depth {
            start_index += 1;
        } else if start.text_offset() > 0 {
            if let Some(after) = start.node_after() {
                push_joined(target, after);
            }
            start_index += 1;
        }
    }
    for i in start_index..end_index {
        push_joined(target, node.child(i).clone());
    }
    if let Some(end) = end {
        if end.depth() == depth && end.text_offset() > 0 {
            if let Some(before) = end.node_before() {
                push_joined(target, before);
            }
        }
    }
}

fn close(node: &Node, content: Fragment) -> Result<Node, ModelError> {
    Node::check_content(node.node_type(), &content)?;
    Ok(node.copy(content))
}

fn replace_three_way(
    from: &ResolvedPos<'_>,
    start: &ResolvedPos<'_>,
    end: &ResolvedPos<'_>,
    to: &ResolvedPos<'_>,
    depth: usize,
) -> Result<Fragment, ModelError> {
    let open_start = if from.depth() > depth { Some(joinable(from, start, depth + 1)?) } else { None };
    let open_end = if to.depth() > depth { Some(joinable(end, to, depth + 1)?) } else { None };

    let mut content = Vec::new();
    add_range(None, Some(from), depth, &mut content);
    match (open_start, open_end) {
        (Some(os), Some(oe)) if start.index(depth) == end.index(depth) => {
            check_join(os, oe)?;
            let inner = replace_three_way(from, start, end, to, depth + 1)?;
            push_joined(&mut content, close(os, inner)?);
        }
        _ => {
            if let Some(os) = open_start {
                let inner = replace_two_way(from, start, depth + 1)?;
                push_joined(&mut content, close(os, inner)?);
            }
            add_range(Some(start), Some(end), depth, &mut content);
            if let Some(oe) = open_end {
                let inner = replace_two_way(end, to, depth + 1)?;
                push_joined(&mut content, close(oe, inner)?);
            }
        }
    }
    add_range(Some(to), None, depth, &mut content);
    Ok(Fragment::from_nodes(content))
}

fn replace_two_way(
    from: &ResolvedPos<'_>,
    to: &ResolvedPos<'_>,
    depth: usize,
) -> Result<Fragment, ModelError> {
    let mut content = Vec::new();
    add_range(None, Some(from), depth, &mut content);
    if from.depth() > depth {
        let node = joinable(from, to, depth + 1)?;
        let inner = replace_two_way(from, to, depth + 1)?;
        push_joined(&mut content, close(node, inner)?);
    }
    add_range(Some(to), None, depth, &mut content);
    Ok(Fragment::from_nodes(content))
}

/// Wrap the slice content in copies of the ancestors of `along` so that it
/// can be resolved at the same depths as the target range. Returns the
/// wrapper and the positions of the slice's start and end inside it.
fn prepare_slice_for_replace(slice: &Slice, along: &ResolvedPos<'_>) -> (Node, usize, usize) {
    let extra = along.depth() - slice.open_start();
    let parent = along.node(extra);
    let mut node = parent.copy(slice.content().clone());
    for i in (0..extra).rev() {
        node = along.node(i).copy(Fragment::from_node(node));
    }
    let start = slice.open_start() + extra;
    let end = node.content_size() - slice.open_end() - extra;
    (node, start, end)
}
