//! Collaborative editing: unconfirmed local steps and rebasing them over
//! steps confirmed by the server.
//!
//! Every local step is kept with its inverse until the server confirms it.
//! When remote steps arrive, the unconfirmed steps are undone, the remote
//! steps applied, and the local steps mapped over them and re-applied. The
//! mapping pairs each undo with its redo (mirrors), so positions inside
//! locally inserted content survive the round trip.

use serde_json::json;
use tracing::{debug, warn};

use crate::{EditorState, MetaKey, Step, StepError, Transaction, Transform};

/// A local step with its inverse against the document it was applied to.
#[derive(Debug, Clone, PartialEq)]
pub struct Rebaseable {
    pub step: Step,
    pub inverted: Step,
}

/// Collab bookkeeping carried by an [`EditorState`].
#[derive(Debug, Clone, PartialEq)]
pub struct CollabState {
    version: u64,
    unconfirmed: Vec<Rebaseable>,
    client_id: u32,
}

impl CollabState {
    pub fn new(version: u64, client_id: u32) -> Self {
        Self { version, unconfirmed: Vec::new(), client_id }
    }

    /// Last version confirmed by the server.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn unconfirmed(&self) -> &[Rebaseable] {
        &self.unconfirmed
    }

    pub fn client_id(&self) -> u32 {
        self.client_id
    }

    /// Same state with the steps of `tr` appended as unconfirmed.
    pub(crate) fn with_local_steps(&self, tr: &Transform) -> CollabState {
        let mut unconfirmed = self.unconfirmed.clone();
        for (step, doc) in tr.steps().iter().zip(tr.docs()) {
            match step.invert(doc) {
                Ok(inverted) => unconfirmed.push(Rebaseable { step: step.clone(), inverted }),
                Err(e) => warn!("local step not invertible, dropped from unconfirmed: {}", e),
            }
        }
        CollabState { unconfirmed, ..self.clone() }
    }
}

/// Steps ready to be sent, with the version they are based on.
#[derive(Debug, Clone, PartialEq)]
pub struct SendableSteps {
    pub version: u64,
    pub steps: Vec<Step>,
    pub client_id: u32,
}

/// The unconfirmed steps of `state`, or `None` if there are none.
pub fn sendable_steps(state: &EditorState) -> Option<SendableSteps> {
    let collab = state.collab();
    if collab.unconfirmed.is_empty() {
        return None;
    }
    Some(SendableSteps {
        version: collab.version,
        steps: collab.unconfirmed.iter().map(|r| r.step.clone()).collect(),
        client_id: collab.client_id,
    })
}

/// Build the transaction that applies confirmed `steps` to `state`.
///
/// `client_ids[i]` is the client that authored `steps[i]`. A leading run of
/// our own client id confirms that many unconfirmed steps. Remaining steps
/// are applied with the unconfirmed local steps rebased on top.
///
/// Fails if a remote step (or the undo of a local step) does not apply;
/// `state` is then out of sync with the server. Local steps that no longer
/// apply after rebasing are dropped.
pub fn receive_transaction(
    state: &EditorState,
    steps: &[Step],
    client_ids: &[u32],
) -> Result<Transaction, StepError> {
    let collab = state.collab();
    let version = collab.version + steps.len() as u64;
    let ours = client_ids.iter().take_while(|id| **id == collab.client_id).count();
    let ours = ours.min(collab.unconfirmed.len()).min(steps.len());
    let unconfirmed = &collab.unconfirmed[ours..];
    let steps = &steps[ours..];

    let mut tr = state.tr();
    if steps.is_empty() {
        tr.set_collab(CollabState { version, unconfirmed: unconfirmed.to_vec(), ..collab.clone() });
        return Ok(tr);
    }

    let rebased = unconfirmed.len();
    let unconfirmed = rebase(unconfirmed, steps, 0, &mut tr)?;
    debug!(remote = steps.len(), rebased, kept = unconfirmed.len(), "received steps");
    tr.set_meta(MetaKey::Rebased, json!(rebased));
    tr.set_meta(MetaKey::AddToHistory, json!(false));
    tr.set_collab(CollabState { version, unconfirmed, ..collab.clone() });
    Ok(tr)
}

/// Build the transaction that drops the first `count` unconfirmed steps
/// from the document, keeping later ones mapped over their removal.
pub fn discard_unconfirmed(state: &EditorState, count: usize) -> Result<Transaction, StepError> {
    let collab = state.collab();
    let count = count.min(collab.unconfirmed.len());
    let mut tr = state.tr();
    let unconfirmed = rebase(&collab.unconfirmed, &[], count, &mut tr)?;
    tr.set_meta(MetaKey::Rebased, json!(collab.unconfirmed.len()));
    tr.set_meta(MetaKey::AddToHistory, json!(false));
    tr.set_collab(CollabState { unconfirmed, ..collab.clone() });
    Ok(tr)
}

/// Undo `steps`, apply `over`, then redo `steps[skip..]` mapped over the
/// result. Returns the redone steps with fresh inverses.
fn rebase(
    steps: &[Rebaseable],
    over: &[Step],
    skip: usize,
    tr: &mut Transaction,
) -> Result<Vec<Rebaseable>, StepError> {
    for rebaseable in steps.iter().rev() {
        tr.step(rebaseable.inverted.clone())?;
    }
    for step in over {
        tr.step(step.clone())?;
    }
    let mut result = Vec::new();
    let mut map_from = steps.len();
    for (i, rebaseable) in steps.iter().enumerate() {
        let mapped = rebaseable.step.map(&tr.mapping.slice(map_from));
        map_from -= 1;
        if i < skip {
            continue;
        }
        let Some(mapped) = mapped else {
            debug!("unconfirmed step deleted by rebase");
            continue;
        };
        let before = tr.doc().clone();
        match tr.step(mapped.clone()) {
            Ok(()) => {
                let last = tr.steps.len() - 1;
                tr.mapping.set_mirror(map_from, last);
                match mapped.invert(&before) {
                    Ok(inverted) => result.push(Rebaseable { step: mapped, inverted }),
                    Err(e) => warn!("rebased step not invertible: {}", e),
                }
            }
            Err(e) => debug!("unconfirmed step no longer applies: {}", e),
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::*;
    use crate::step::ReplaceStep;
    use crate::{Node, Slice};

    fn insert(pos: usize, s: &str) -> Step {
        Step::Replace(ReplaceStep::new(pos, pos, Slice::closed(vec![text(s)])))
    }

    fn base() -> Node {
        doc(vec![p(vec![text("hello")])])
    }

    fn local_edit(state: &EditorState, step: Step) -> EditorState {
        let mut tr = state.tr();
        tr.step(step).unwrap();
        state.apply(&tr)
    }

    #[test]
    fn test_sendable_steps() {
        let state = EditorState::new(base(), CollabState::new(4, 9));
        assert!(sendable_steps(&state).is_none());
        let state = local_edit(&state, insert(1, "A"));
        let sendable = sendable_steps(&state).unwrap();
        assert_eq!(sendable.version, 4);
        assert_eq!(sendable.client_id, 9);
        assert_eq!(sendable.steps.len(), 1);
    }

    #[test]
    fn test_own_steps_confirm() {
        let state = EditorState::new(base(), CollabState::new(0, 9));
        let state = local_edit(&state, insert(1, "A"));
        let steps = sendable_steps(&state).unwrap().steps;
        let tr = receive_transaction(&state, &steps, &[9]).unwrap();
        assert!(!tr.doc_changed());
        let state = state.apply(&tr);
        assert_eq!(state.collab().version(), 1);
        assert!(state.collab().unconfirmed().is_empty());
        assert_eq!(state.doc().text_content(), "Ahello");
    }

    #[test]
    fn test_rebase_over_remote() {
        let state = EditorState::new(base(), CollabState::new(0, 9));
        let state = local_edit(&state, insert(6, "!"));
        let tr = receive_transaction(&state, &[insert(1, ">")], &[2]).unwrap();
        assert_eq!(tr.meta(&MetaKey::Rebased), Some(&json!(1)));
        let state = state.apply(&tr);
        assert_eq!(state.doc().text_content(), ">hello!");
        assert_eq!(state.collab().version(), 1);
        let pending = sendable_steps(&state).unwrap();
        assert_eq!(pending.steps, vec![insert(7, "!")]);
    }

    #[test]
    fn test_failed_remote_step_is_error() {
        let state = EditorState::new(base(), CollabState::new(0, 9));
        assert!(receive_transaction(&state, &[insert(40, "x")], &[2]).is_err());
    }

    #[test]
    fn test_discard_first_unconfirmed() {
        let state = EditorState::new(base(), CollabState::new(0, 9));
        let state = local_edit(&state, insert(1, "AB"));
        let state = local_edit(&state, insert(8, "!"));
        assert_eq!(state.doc().text_content(), "ABhello!");
        let tr = discard_unconfirmed(&state, 1).unwrap();
        let state = state.apply(&tr);
        assert_eq!(state.doc().text_content(), "hello!");
        assert_eq!(sendable_steps(&state).unwrap().steps, vec![insert(6, "!")]);
    }
}
