//! Inline marks.
//!
//! Marks form a set on each inline node: at most one mark per [`MarkType`],
//! kept sorted by type rank so that two sets with the same marks compare
//! equal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Mark type names, in rank order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MarkType {
    Link,
    Bold,
    Italic,
    Code,
    Underline,
    Strike,
    Insertion,
    Deletion,
    FormatChange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAttrs {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Attributes of an `insertion` mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertionAttrs {
    /// Id of the inserting user.
    pub user: String,
    pub username: String,
    pub date: DateTime<Utc>,
    /// Inserted while tracking was off; not pending review.
    #[serde(default)]
    pub approved: bool,
}

/// Attributes of a `deletion` mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionAttrs {
    pub user: String,
    pub username: String,
    pub date: DateTime<Utc>,
}

/// Attributes of a `format_change` mark: which mark types were removed
/// (`before`) and added (`after`) relative to the original formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatChangeAttrs {
    pub user: String,
    pub username: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub before: Vec<MarkType>,
    #[serde(default)]
    pub after: Vec<MarkType>,
}

/// A mark instance. Serializes as `{"type": ..., "attrs": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "attrs", rename_all = "snake_case")]
pub enum Mark {
    Link(LinkAttrs),
    Bold,
    Italic,
    Code,
    Underline,
    Strike,
    Insertion(InsertionAttrs),
    Deletion(DeletionAttrs),
    FormatChange(FormatChangeAttrs),
}

impl Mark {
    /// Attribute-less mark of the given type, if the type has no attributes.
    pub fn simple(mark_type: MarkType) -> Option<Mark> {
        match mark_type {
            MarkType::Bold => Some(Mark::Bold),
            MarkType::Italic => Some(Mark::Italic),
            MarkType::Code => Some(Mark::Code),
            MarkType::Underline => Some(Mark::Underline),
            MarkType::Strike => Some(Mark::Strike),
            _ => None,
        }
    }

    pub fn mark_type(&self) -> MarkType {
        match self {
            Mark::Link(_) => MarkType::Link,
            Mark::Bold => MarkType::Bold,
            Mark::Italic => MarkType::Italic,
            Mark::Code => MarkType::Code,
            Mark::Underline => MarkType::Underline,
            Mark::Strike => MarkType::Strike,
            Mark::Insertion(_) => MarkType::Insertion,
            Mark::Deletion(_) => MarkType::Deletion,
            Mark::FormatChange(_) => MarkType::FormatChange,
        }
    }

    /// Add this mark to a set, replacing any mark of the same type.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        if self.is_in_set(set) {
            return set.to_vec();
        }
        let ty = self.mark_type();
        let mut result: Vec<Mark> = set.iter().filter(|m| m.mark_type() != ty).cloned().collect();
        let at = result
            .iter()
            .position(|m| m.mark_type() > ty)
            .unwrap_or(result.len());
        result.insert(at, self.clone());
        result
    }

    /// Remove this exact mark from a set.
    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|m| *m != self).cloned().collect()
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.iter().any(|m| m == self)
    }
}

/// The mark of the given type in a set, if any.
pub fn find_mark(set: &[Mark], mark_type: MarkType) -> Option<&Mark> {
    set.iter().find(|m| m.mark_type() == mark_type)
}

/// Sort a set into rank order, keeping the last mark of each type.
pub fn normalize_marks(marks: Vec<Mark>) -> Vec<Mark> {
    marks.iter().fold(Vec::new(), |set, mark| mark.add_to_set(&set))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T10:20:00Z")
            .expect("valid date")
            .with_timezone(&Utc)
    }

    #[test]
    fn test_add_to_set_keeps_rank_order() {
        let set = Mark::Italic.add_to_set(&[Mark::Strike]);
        let set = Mark::Bold.add_to_set(&set);
        assert_eq!(set, vec![Mark::Bold, Mark::Italic, Mark::Strike]);
    }

    #[test]
    fn test_add_to_set_replaces_same_type() {
        let a = Mark::Deletion(DeletionAttrs { user: "a".into(), username: "A".into(), date: date() });
        let b = Mark::Deletion(DeletionAttrs { user: "b".into(), username: "B".into(), date: date() });
        let set = b.add_to_set(&[a, Mark::Bold]);
        assert_eq!(set.len(), 2);
        assert_eq!(set[1], b);
    }

    #[test]
    fn test_json_shape() {
        assert_eq!(serde_json::to_value(Mark::Bold).unwrap(), json!({"type": "bold"}));
        let mark = Mark::FormatChange(FormatChangeAttrs {
            user: "1".into(),
            username: "ann".into(),
            date: date(),
            before: vec![],
            after: vec![MarkType::Bold],
        });
        let value = serde_json::to_value(&mark).unwrap();
        assert_eq!(value["type"], "format_change");
        assert_eq!(value["attrs"]["after"], json!(["bold"]));
        let back: Mark = serde_json::from_value(value).unwrap();
        assert_eq!(back, mark);
    }
}
