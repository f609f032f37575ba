//! Who else is editing the document.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One connected session as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantEntry {
    pub id: String,
    pub session_id: String,
    #[serde(default)]
    pub name: String,
}

/// A user with every session they have open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub session_ids: Vec<String>,
}

/// What changed with a presence update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceChange {
    /// Sessions gone since the previous list. Their carets should go too.
    pub removed_sessions: Vec<String>,
    /// Participants gone entirely.
    pub removed_participants: Vec<String>,
    /// This was the first list and it held a single session.
    pub solo_owner: bool,
}

/// Participants by id, in the order the server lists them.
#[derive(Debug, Clone, Default)]
pub struct ParticipantRegistry {
    participants: IndexMap<String, Participant>,
    session_ids: BTreeSet<String>,
    seen_list: bool,
    solo_owner_fired: bool,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the participants with those in `entries`.
    ///
    /// Entries sharing an id merge into one participant. The solo-owner
    /// flag is raised at most once per registry, for a first list with
    /// exactly one session.
    pub fn update_participant_list(&mut self, entries: &[ParticipantEntry]) -> PresenceChange {
        let mut participants: IndexMap<String, Participant> = IndexMap::new();
        let mut session_ids = BTreeSet::new();
        for entry in entries {
            session_ids.insert(entry.session_id.clone());
            let participant = participants.entry(entry.id.clone()).or_insert_with(|| Participant {
                id: entry.id.clone(),
                name: entry.name.clone(),
                session_ids: Vec::new(),
            });
            if !participant.session_ids.contains(&entry.session_id) {
                participant.session_ids.push(entry.session_id.clone());
            }
        }

        let removed_sessions =
            self.session_ids.difference(&session_ids).cloned().collect::<Vec<_>>();
        let removed_participants = self
            .participants
            .keys()
            .filter(|id| !participants.contains_key(*id))
            .cloned()
            .collect::<Vec<_>>();

        let solo_owner = !self.seen_list && !self.solo_owner_fired && session_ids.len() == 1;
        if solo_owner {
            self.solo_owner_fired = true;
        }
        self.seen_list = true;

        debug!(
            participants = participants.len(),
            sessions = session_ids.len(),
            removed = removed_sessions.len(),
            "participant list updated"
        );
        self.participants = participants;
        self.session_ids = session_ids;
        PresenceChange { removed_sessions, removed_participants, solo_owner }
    }

    pub fn find(&self, id: &str) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// More than one participant is present.
    pub fn collaborating(&self) -> bool {
        self.participants.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, session_id: &str) -> ParticipantEntry {
        ParticipantEntry { id: id.into(), session_id: session_id.into(), name: id.to_uppercase() }
    }

    #[test]
    fn test_sessions_merge_by_id() {
        let mut registry = ParticipantRegistry::new();
        registry.update_participant_list(&[entry("a", "s1"), entry("b", "s2"), entry("a", "s3")]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find("a").unwrap().session_ids, vec!["s1", "s3"]);
        assert!(registry.collaborating());
        let ids: Vec<_> = registry.participants().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_removed_sessions() {
        let mut registry = ParticipantRegistry::new();
        registry.update_participant_list(&[entry("a", "s1"), entry("b", "s2")]);
        let change = registry.update_participant_list(&[entry("a", "s1")]);
        assert_eq!(change.removed_sessions, vec!["s2"]);
        assert_eq!(change.removed_participants, vec!["b"]);
        assert!(!registry.collaborating());
        assert!(registry.find("b").is_none());
    }

    #[test]
    fn test_solo_owner_once() {
        let mut registry = ParticipantRegistry::new();
        assert!(registry.update_participant_list(&[entry("a", "s1")]).solo_owner);
        assert!(!registry.update_participant_list(&[entry("a", "s1")]).solo_owner);
        registry.update_participant_list(&[]);
        assert!(!registry.update_participant_list(&[entry("a", "s1")]).solo_owner);
    }

    #[test]
    fn test_no_solo_owner_when_first_list_is_shared() {
        let mut registry = ParticipantRegistry::new();
        assert!(!registry.update_participant_list(&[entry("a", "s1"), entry("b", "s2")]).solo_owner);
        assert!(!registry.update_participant_list(&[entry("a", "s1")]).solo_owner);
    }

    #[test]
    fn test_tab_switch_keeps_participant() {
        let mut registry = ParticipantRegistry::new();
        registry.update_participant_list(&[entry("a", "s1")]);
        let change = registry.update_participant_list(&[entry("a", "s2")]);
        assert!(change.removed_participants.is_empty());
        assert_eq!(change.removed_sessions, vec!["s1"]);
        assert_eq!(registry.find("a").unwrap().session_ids, vec!["s2"]);
    }
}
