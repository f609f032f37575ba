use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{BLOCK_DATE_MINUTES, MARK_DATE_MINUTES};

/// The author changes are attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self { id: id.into(), username: username.into() }
    }
}

/// Annotation timestamps derived from one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackDates {
    /// For `track` entries on blocks.
    pub block: DateTime<Utc>,
    /// For insertion, deletion and format-change marks.
    pub mark: DateTime<Utc>,
}

impl TrackDates {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            block: truncate(now, BLOCK_DATE_MINUTES),
            mark: truncate(now, MARK_DATE_MINUTES),
        }
    }
}

fn truncate(now: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    now.duration_trunc(TimeDelta::minutes(minutes)).unwrap_or(now)
}
