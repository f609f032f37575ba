//! Step accumulation.

use serde_json::Value;
use tracing::trace;

use crate::mapping::{Mappable, Mapping};
use crate::step::{AttrStep, MarkStep, ReplaceAroundStep, ReplaceStep};
use crate::{
    Attrs, Fragment, Mark, MarkType, Node, NodeType, Slice, Step, StepError, TRACK_ATTR, TrackAttr,
    Walk,
};

/// Which marks [`Transform::remove_mark`] removes.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoveMarks {
    /// This exact mark.
    Exact(Mark),
    /// Any mark of this type.
    OfType(MarkType),
}

impl From<Mark> for RemoveMarks {
    fn from(mark: Mark) -> Self {
        RemoveMarks::Exact(mark)
    }
}

impl From<MarkType> for RemoveMarks {
    fn from(mark_type: MarkType) -> Self {
        RemoveMarks::OfType(mark_type)
    }
}

/// A document plus the steps applied to it so far.
///
/// `docs[i]` is the document before `steps[i]`; `mapping` holds one step map
/// per step.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub(crate) doc: Node,
    pub(crate) docs: Vec<Node>,
    pub(crate) steps: Vec<Step>,
    pub(crate) mapping: Mapping,
}

impl Transform {
    pub fn new(doc: Node) -> Self {
        Self { doc, docs: Vec::new(), steps: Vec::new(), mapping: Mapping::new() }
    }

    /// The current document.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// The document before the first step.
    pub fn before(&self) -> &Node {
        self.docs.first().unwrap_or(&self.doc)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn docs(&self) -> &[Node] {
        &self.docs
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Apply a step. On failure nothing changes.
    pub fn step(&mut self, step: Step) -> Result<(), StepError> {
        let doc = step.apply(&self.doc)?;
        trace!(?step, "step applied");
        self.mapping.append_map(step.get_map(), None);
        self.docs.push(std::mem::replace(&mut self.doc, doc));
        self.steps.push(step);
        Ok(())
    }

    pub fn replace(&mut self, from: usize, to: usize, slice: Slice) -> Result<(), StepError> {
        if from == to && slice.is_empty() {
            return Ok(());
        }
        self.step(Step::Replace(ReplaceStep::new(from, to, slice)))
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<(), StepError> {
        self.replace(from, to, Slice::empty())
    }

    pub fn insert(&mut self, pos: usize, nodes: Vec<Node>) -> Result<(), StepError> {
        self.replace(pos, pos, Slice::closed(nodes))
    }

    /// Add a mark to all inline content between `from` and `to`.
    pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> Result<(), StepError> {
        let mut removed: Vec<MarkStep> = Vec::new();
        let mut added: Vec<MarkStep> = Vec::new();
        self.doc.nodes_between(from, to, |v| {
            if !v.node.is_inline() {
                return Walk::Descend;
            }
            let marks = v.node.marks();
            if mark.is_in_set(marks) || !v.parent.node_type().allows_marks() {
                return Walk::Skip;
            }
            let start = v.pos.max(from);
            let end = (v.pos + v.node.node_size()).min(to);
            let new_set = mark.add_to_set(marks);
            for old in marks.iter().filter(|m| !m.is_in_set(&new_set)) {
                match removed.last_mut() {
                    Some(last) if last.to == start && last.mark == *old => last.to = end,
                    _ => removed.push(MarkStep { from: start, to: end, mark: old.clone() }),
                }
            }
            match added.last_mut() {
                Some(last) if last.to == start => last.to = end,
                _ => added.push(MarkStep { from: start, to: end, mark: mark.clone() }),
            }
            Walk::Skip
        });
        for step in removed {
            self.step(Step::RemoveMark(step))?;
        }
        for step in added {
            self.step(Step::AddMark(step))?;
        }
        Ok(())
    }

    /// Remove marks from inline content between `from` and `to`.
    pub fn remove_mark(
        &mut self,
        from: usize,
        to: usize,
        which: impl Into<RemoveMarks>,
    ) -> Result<(), StepError> {
        struct Matched {
            mark: Mark,
            from: usize,
            to: usize,
            step: usize,
        }
        let which = which.into();
        let mut matched: Vec<Matched> = Vec::new();
        let mut step = 0;
        self.doc.nodes_between(from, to, |v| {
            if !v.node.is_inline() {
                return Walk::Descend;
            }
            step += 1;
            let to_remove: Vec<&Mark> = match &which {
                RemoveMarks::Exact(mark) => v.node.marks().iter().filter(|m| *m == mark).collect(),
                RemoveMarks::OfType(ty) => {
                    v.node.marks().iter().filter(|m| m.mark_type() == *ty).collect()
                }
            };
            let end = (v.pos + v.node.node_size()).min(to);
            for mark in to_remove {
                match matched.iter_mut().find(|m| m.step + 1 == step && m.mark == *mark) {
                    Some(found) => {
                        found.to = end;
                        found.step = step;
                    }
                    None => matched.push(Matched { mark: mark.clone(), from: v.pos.max(from), to: end, step }),
                }
            }
            Walk::Skip
        });
        for m in matched {
            self.step(Step::RemoveMark(MarkStep { from: m.from, to: m.to, mark: m.mark }))?;
        }
        Ok(())
    }

    /// Set a single attribute on the node at `pos`.
    pub fn set_node_attr(&mut self, pos: usize, attr: &str, value: Value) -> Result<(), StepError> {
        self.step(Step::Attr(AttrStep { pos, attr: attr.to_owned(), value }))
    }

    /// Replace the `track` list of the node at `pos`.
    pub fn set_track(&mut self, pos: usize, track: &[TrackAttr]) -> Result<(), StepError> {
        let entries = track.iter().filter_map(|t| serde_json::to_value(t).ok()).collect();
        self.set_node_attr(pos, TRACK_ATTR, Value::Array(entries))
    }

    /// Set each of `attrs` on the node at `pos`, skipping unchanged ones.
    pub fn set_node_attrs(&mut self, pos: usize, attrs: &Attrs) -> Result<(), StepError> {
        let node = self.doc.node_at(pos).ok_or(StepError::NoNodeAt(pos))?;
        let changed: Vec<(String, Value)> = attrs
            .iter()
            .filter(|(name, value)| node.attr(name) != Some(*value))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        for (name, value) in changed {
            self.set_node_attr(pos, &name, value)?;
        }
        Ok(())
    }

    /// Change the type and attributes of the node at `pos`, keeping its
    /// content.
    pub fn set_node_markup(
        &mut self,
        pos: usize,
        node_type: NodeType,
        attrs: Attrs,
    ) -> Result<(), StepError> {
        let node = self.doc.node_at(pos).ok_or(StepError::NoNodeAt(pos))?;
        let size = node.node_size();
        let replacement = Node::new(node_type, attrs, Fragment::empty(), node.marks().to_vec());
        if node.is_leaf() {
            return self.replace(pos, pos + size, Slice::closed(vec![replacement]));
        }
        Node::check_content(node_type, node.content())?;
        self.step(Step::ReplaceAround(ReplaceAroundStep {
            from: pos,
            to: pos + size,
            gap_from: pos + 1,
            gap_to: pos + size - 1,
            slice: Slice::closed(vec![replacement]),
            insert: 1,
            structure: true,
        }))
    }

    /// Map a position through every step so far.
    pub fn map(&self, pos: usize, bias: crate::Bias) -> usize {
        self.mapping.map(pos, bias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::*;

    #[test]
    fn test_step_records_history() {
        let d = doc(vec![p(vec![text("abc")])]);
        let mut tr = Transform::new(d.clone());
        tr.insert(2, vec![text("X")]).unwrap();
        tr.delete(1, 2).unwrap();
        assert_eq!(tr.steps().len(), 2);
        assert_eq!(tr.docs()[0], d);
        assert_eq!(tr.before(), &d);
        assert_eq!(tr.doc().text_content(), "Xbc");
        assert_eq!(tr.map(3, crate::Bias::After), 3);
    }

    #[test]
    fn test_failed_step_leaves_state() {
        let d = doc(vec![p(vec![text("abc")])]);
        let mut tr = Transform::new(d.clone());
        assert!(tr.delete(2, 40).is_err());
        assert!(!tr.doc_changed());
        assert_eq!(tr.doc(), &d);
    }

    #[test]
    fn test_add_mark_merges_ranges() {
        let d = doc(vec![p(vec![text("ab"), marked("cd", vec![Mark::Italic]), text("ef")])]);
        let mut tr = Transform::new(d);
        tr.add_mark(1, 7, Mark::Bold).unwrap();
        assert_eq!(tr.steps().len(), 1);
        let para = tr.doc().child(0);
        assert!(para.content().iter().all(|n| n.has_mark(MarkType::Bold)));
    }

    #[test]
    fn test_remove_mark_by_type() {
        let d = doc(vec![p(vec![marked("abc", vec![Mark::Bold, Mark::Italic])])]);
        let mut tr = Transform::new(d);
        tr.remove_mark(2, 3, MarkType::Bold).unwrap();
        let para = tr.doc().child(0);
        assert_eq!(para.child_count(), 3);
        assert!(!para.child(1).has_mark(MarkType::Bold));
        assert!(para.child(1).has_mark(MarkType::Italic));
    }

    #[test]
    fn test_set_node_markup() {
        let d = doc(vec![p(vec![text("Title")])]);
        let mut tr = Transform::new(d);
        let mut attrs = Attrs::new();
        attrs.insert("level".into(), serde_json::json!(2));
        tr.set_node_markup(0, NodeType::Heading, attrs).unwrap();
        assert_eq!(tr.doc(), &doc(vec![h(2, vec![text("Title")])]));
    }

    #[test]
    fn test_set_track() {
        let d = doc(vec![p(vec![text("abc")])]);
        let mut tr = Transform::new(d);
        let date = chrono::DateTime::parse_from_rfc3339("2024-05-01T10:20:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let entry = TrackAttr::new(crate::TrackKind::Insertion, "u1", "Ann", date);
        tr.set_track(0, std::slice::from_ref(&entry)).unwrap();
        assert_eq!(tr.doc().child(0).track(), vec![entry]);
        assert_eq!(tr.doc().content_size(), 5);
    }
}
