//! Two clients editing the same document through a minimal in-memory
//! authority converge on the same content.

use quire_doc::build::*;
use quire_doc::{
    Bias, CollabState, EditorState, Mappable, Mapping, Node, Slice, Step, StepMap,
    receive_transaction, sendable_steps,
};
use quire_doc::{ReplaceStep, Selection};

/// Accepts steps only when based on its current version.
struct Authority {
    doc: Node,
    steps: Vec<(Step, u32)>,
}

impl Authority {
    fn new(doc: Node) -> Self {
        Self { doc, steps: Vec::new() }
    }

    fn version(&self) -> u64 {
        self.steps.len() as u64
    }

    fn receive(&mut self, version: u64, steps: &[Step], client_id: u32) -> bool {
        if version != self.version() {
            return false;
        }
        for step in steps {
            self.doc = step.apply(&self.doc).unwrap();
            self.steps.push((step.clone(), client_id));
        }
        true
    }

    fn since(&self, version: u64) -> (Vec<Step>, Vec<u32>) {
        self.steps[version as usize..].iter().cloned().unzip()
    }
}

fn insert(pos: usize, s: &str) -> Step {
    Step::Replace(ReplaceStep::new(pos, pos, Slice::closed(vec![text(s)])))
}

fn edit(state: &EditorState, step: Step) -> EditorState {
    let mut tr = state.tr();
    tr.step(step).unwrap();
    state.apply(&tr)
}

fn sync(state: &EditorState, authority: &Authority) -> EditorState {
    let (steps, ids) = authority.since(state.collab().version());
    let tr = receive_transaction(state, &steps, &ids).unwrap();
    state.apply(&tr)
}

// ============================================================================
// Convergence
// ============================================================================

#[test]
fn test_concurrent_inserts_converge() {
    let base = doc(vec![p(vec![text("hello")])]);
    let mut authority = Authority::new(base.clone());
    let a = EditorState::new(base.clone(), CollabState::new(0, 1));
    let b = EditorState::new(base, CollabState::new(0, 2));

    let a = edit(&a, insert(1, "A"));
    let b = edit(&b, insert(6, "B"));

    let sent = sendable_steps(&a).unwrap();
    assert!(authority.receive(sent.version, &sent.steps, sent.client_id));

    let sent = sendable_steps(&b).unwrap();
    assert!(!authority.receive(sent.version, &sent.steps, sent.client_id));

    let b = sync(&b, &authority);
    let sent = sendable_steps(&b).unwrap();
    assert_eq!(sent.version, 1);
    assert!(authority.receive(sent.version, &sent.steps, sent.client_id));

    let a = sync(&a, &authority);
    let b = sync(&b, &authority);

    assert_eq!(a.doc(), &authority.doc);
    assert_eq!(b.doc(), &authority.doc);
    assert_eq!(a.doc().text_content(), "AhelloB");
    assert!(a.collab().unconfirmed().is_empty());
    assert!(b.collab().unconfirmed().is_empty());
    assert_eq!(a.collab().version(), 2);
}

#[test]
fn test_selection_follows_remote_insert() {
    let base = doc(vec![p(vec![text("hello")])]);
    let state = EditorState::new(base, CollabState::new(0, 1)).with_selection(Selection::caret(4));
    let tr = receive_transaction(&state, &[insert(1, "xyz")], &[7]).unwrap();
    let state = state.apply(&tr);
    assert_eq!(state.selection(), &Selection::caret(7));
}

// ============================================================================
// Mapping composition
// ============================================================================

#[test]
fn test_mapping_composition() {
    let m1 = Mapping::from_maps(vec![StepMap::new([(2, 3, 1)]), StepMap::new([(0, 0, 4)])]);
    let m2 = Mapping::from_maps(vec![StepMap::new([(5, 2, 0)])]);
    let mut both = m1.clone();
    both.append_mapping(&m2);
    for pos in 0..12 {
        for bias in [Bias::Before, Bias::After] {
            assert_eq!(both.map(pos, bias), m2.map(m1.map(pos, bias), bias), "pos {pos}");
        }
    }
}
