//! Atomic, invertible document edits.
//!
//! Steps are the unit of transmission: their JSON form is tagged by
//! `stepType` (`replace`, `replaceAround`, `addMark`, `removeMark`, `attr`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mapping::{Bias, Mappable, StepMap};
use crate::{Fragment, Mark, Node, NodeType, Slice, StepError};

/// Replace `from..to` with a slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceStep {
    pub from: usize,
    pub to: usize,
    #[serde(default, skip_serializing_if = "Slice::is_empty")]
    pub slice: Slice,
    /// Only node boundaries may be replaced; fails if real content is in range.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub structure: bool,
}

/// Replace `from..to` with a slice, keeping the content of `gap_from..gap_to`
/// and placing it at `insert` inside the slice. Used for wrapping and
/// unwrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceAroundStep {
    pub from: usize,
    pub to: usize,
    pub gap_from: usize,
    pub gap_to: usize,
    #[serde(default, skip_serializing_if = "Slice::is_empty")]
    pub slice: Slice,
    pub insert: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub structure: bool,
}

/// Add or remove a mark on the inline content of `from..to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkStep {
    pub from: usize,
    pub to: usize,
    pub mark: Mark,
}

/// Set one attribute of the node at `pos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrStep {
    pub pos: usize,
    pub attr: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stepType", rename_all = "camelCase")]
pub enum Step {
    Replace(ReplaceStep),
    ReplaceAround(ReplaceAroundStep),
    AddMark(MarkStep),
    RemoveMark(MarkStep),
    Attr(AttrStep),
}

impl ReplaceStep {
    pub fn new(from: usize, to: usize, slice: Slice) -> Self {
        Self { from, to, slice, structure: false }
    }

    pub fn delete(from: usize, to: usize) -> Self {
        Self::new(from, to, Slice::empty())
    }
}

impl Step {
    /// Apply to `doc`, producing the new document.
    pub fn apply(&self, doc: &Node) -> Result<Node, StepError> {
        match self {
            Step::Replace(s) => {
                if s.from > s.to {
                    return Err(StepError::InvalidRange { from: s.from, to: s.to });
                }
                if s.structure && content_between(doc, s.from, s.to)? {
                    return Err(StepError::StructureOverwrite);
                }
                Ok(doc.replace(s.from, s.to, &s.slice)?)
            }
            Step::ReplaceAround(s) => {
                if !(s.from <= s.gap_from && s.gap_from <= s.gap_to && s.gap_to <= s.to)
                    || s.insert > s.slice.size()
                {
                    return Err(StepError::InvalidRange { from: s.from, to: s.to });
                }
                if s.structure
                    && (content_between(doc, s.from, s.gap_from)?
                        || content_between(doc, s.gap_to, s.to)?)
                {
                    return Err(StepError::StructureOverwrite);
                }
                let gap = doc.slice(s.gap_from, s.gap_to)?;
                if gap.open_start() > 0 || gap.open_end() > 0 {
                    return Err(StepError::GapNotFlat);
                }
                let inserted = s.slice.insert_at(s.insert, gap.content()).ok_or(StepError::GapMismatch)?;
                Ok(doc.replace(s.from, s.to, &inserted)?)
            }
            Step::AddMark(s) => apply_marks(doc, s, |node, parent| {
                if parent.allows_marks() {
                    node.with_marks(s.mark.add_to_set(node.marks()))
                } else {
                    node.clone()
                }
            }),
            Step::RemoveMark(s) => {
                apply_marks(doc, s, |node, _| node.with_marks(s.mark.remove_from_set(node.marks())))
            }
            Step::Attr(s) => {
                let node = doc.node_at(s.pos).ok_or(StepError::NoNodeAt(s.pos))?;
                let mut attrs = node.attrs().clone();
                attrs.insert(s.attr.clone(), s.value.clone());
                let updated = Node::new(node.node_type(), attrs, Fragment::empty(), node.marks().to_vec());
                let open_end = if node.is_leaf() { 0 } else { 1 };
                let slice = Slice::new(Fragment::from_node(updated), 0, open_end);
                Ok(doc.replace(s.pos, s.pos + 1, &slice)?)
            }
        }
    }

    /// How the step moves positions.
    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Replace(s) => StepMap::new([(s.from, s.to.saturating_sub(s.from), s.slice.size())]),
            Step::ReplaceAround(s) => StepMap::new([
                (s.from, s.gap_from.saturating_sub(s.from), s.insert),
                (s.gap_to, s.to.saturating_sub(s.gap_to), s.slice.size().saturating_sub(s.insert)),
            ]),
            Step::AddMark(_) | Step::RemoveMark(_) | Step::Attr(_) => StepMap::empty(),
        }
    }

    /// The step that undoes this one. `doc` is the document before the step.
    pub fn invert(&self, doc: &Node) -> Result<Step, StepError> {
        Ok(match self {
            Step::Replace(s) => {
                Step::Replace(ReplaceStep::new(s.from, s.from + s.slice.size(), doc.slice(s.from, s.to)?))
            }
            Step::ReplaceAround(s) => {
                let gap = s.gap_to - s.gap_from;
                let slice = doc
                    .slice(s.from, s.to)?
                    .remove_between(s.gap_from - s.from, s.gap_to - s.from)?;
                Step::ReplaceAround(ReplaceAroundStep {
                    from: s.from,
                    to: s.from + s.slice.size() + gap,
                    gap_from: s.from + s.insert,
                    gap_to: s.from + s.insert + gap,
                    slice,
                    insert: s.gap_from - s.from,
                    structure: s.structure,
                })
            }
            Step::AddMark(s) => Step::RemoveMark(s.clone()),
            Step::RemoveMark(s) => Step::AddMark(s.clone()),
            Step::Attr(s) => {
                let node = doc.node_at(s.pos).ok_or(StepError::NoNodeAt(s.pos))?;
                let value = node.attr(&s.attr).cloned().unwrap_or(Value::Null);
                Step::Attr(AttrStep { pos: s.pos, attr: s.attr.clone(), value })
            }
        })
    }

    /// Carry the step through a mapping. `None` when its target was deleted.
    pub fn map(&self, mapping: &impl Mappable) -> Option<Step> {
        match self {
            Step::Replace(s) => {
                let from = mapping.map_result(s.from, Bias::After);
                let to = mapping.map_result(s.to, Bias::Before);
                if from.deleted_across() && to.deleted_across() {
                    return None;
                }
                Some(Step::Replace(ReplaceStep {
                    from: from.pos,
                    to: from.pos.max(to.pos),
                    slice: s.slice.clone(),
                    structure: s.structure,
                }))
            }
            Step::ReplaceAround(s) => {
                let from = mapping.map_result(s.from, Bias::After);
                let to = mapping.map_result(s.to, Bias::Before);
                let gap_from =
                    if s.from == s.gap_from { from.pos } else { mapping.map(s.gap_from, Bias::Before) };
                let gap_to = if s.to == s.gap_to { to.pos } else { mapping.map(s.gap_to, Bias::After) };
                if (from.deleted_across() && to.deleted_across()) || gap_from < from.pos || gap_to > to.pos {
                    return None;
                }
                Some(Step::ReplaceAround(ReplaceAroundStep {
                    from: from.pos,
                    to: to.pos,
                    gap_from,
                    gap_to,
                    slice: s.slice.clone(),
                    insert: s.insert,
                    structure: s.structure,
                }))
            }
            Step::AddMark(s) | Step::RemoveMark(s) => {
                let from = mapping.map_result(s.from, Bias::After);
                let to = mapping.map_result(s.to, Bias::Before);
                if (from.deleted() && to.deleted()) || from.pos >= to.pos {
                    return None;
                }
                let mapped = MarkStep { from: from.pos, to: to.pos, mark: s.mark.clone() };
                Some(match self {
                    Step::AddMark(_) => Step::AddMark(mapped),
                    _ => Step::RemoveMark(mapped),
                })
            }
            Step::Attr(s) => {
                let pos = mapping.map_result(s.pos, Bias::After);
                if pos.deleted_after() {
                    return None;
                }
                Some(Step::Attr(AttrStep { pos: pos.pos, attr: s.attr.clone(), value: s.value.clone() }))
            }
        }
    }

    /// Start and end of the range the step touches.
    pub fn range(&self) -> (usize, usize) {
        match self {
            Step::Replace(s) => (s.from, s.to),
            Step::ReplaceAround(s) => (s.from, s.to),
            Step::AddMark(s) | Step::RemoveMark(s) => (s.from, s.to),
            Step::Attr(s) => (s.pos, s.pos + 1),
        }
    }
}

/// Rebuild the inline nodes of `from..to` through `f`, then put them back.
fn apply_marks(
    doc: &Node,
    step: &MarkStep,
    f: impl Fn(&Node, NodeType) -> Node,
) -> Result<Node, StepError> {
    let old = doc.slice(step.from, step.to)?;
    let rfrom = doc.resolve(step.from)?;
    let parent = rfrom.node(rfrom.shared_depth(step.to));
    let content = map_fragment(old.content(), &f, parent.node_type());
    let slice = Slice::new(content, old.open_start(), old.open_end());
    Ok(doc.replace(step.from, step.to, &slice)?)
}

fn map_fragment(fragment: &Fragment, f: &impl Fn(&Node, NodeType) -> Node, parent: NodeType) -> Fragment {
    Fragment::from_nodes(fragment.iter().map(|child| {
        let child = if child.content_size() > 0 {
            child.copy(map_fragment(child.content(), f, child.node_type()))
        } else {
            child.clone()
        };
        if child.is_inline() { f(&child, parent) } else { child }
    }))
}

/// Whether `from..to` contains anything besides node boundaries.
fn content_between(doc: &Node, from: usize, to: usize) -> Result<bool, StepError> {
    let rfrom = doc.resolve(from)?;
    let mut dist = to.saturating_sub(from);
    let mut depth = rfrom.depth();
    while dist > 0 && depth > 0 && rfrom.index_after(depth) == rfrom.node(depth).child_count() {
        depth -= 1;
        dist -= 1;
    }
    if dist > 0 {
        let mut next = rfrom.node(depth).maybe_child(rfrom.index_after(depth));
        while dist > 0 {
            match next {
                Some(node) if !node.is_leaf() => {
                    next = node.first_child();
                    dist -= 1;
                }
                _ => return Ok(true),
            }
        }
    }
    Ok(false)
}
