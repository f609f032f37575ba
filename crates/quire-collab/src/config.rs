//! Session configuration, loadable from RON.
//!
//! ```
//! use quire_collab::SyncConfig;
//!
//! let config = SyncConfig::from_ron("(diff_ack_timeout_ms: 3000)").unwrap();
//! assert_eq!(config.diff_ack_timeout().as_secs(), 3);
//! assert_eq!(config.title_max_chars, 255);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DIFF_ACK_TIMEOUT, SERVER_FIX_DEBOUNCE, TITLE_MAX_CHARS, VERSION_CHECK_TIMEOUT,
};

/// Timing and behavior of a [`DocSyncSession`](crate::DocSyncSession).
///
/// Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub diff_ack_timeout_ms: u64,
    pub version_check_timeout_ms: u64,
    pub server_fix_debounce_ms: u64,
    pub title_max_chars: usize,
    /// Record local edits as tracked changes. When off, edits are still
    /// annotated, but as approved.
    pub track_changes: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            diff_ack_timeout_ms: DIFF_ACK_TIMEOUT.as_millis() as u64,
            version_check_timeout_ms: VERSION_CHECK_TIMEOUT.as_millis() as u64,
            server_fix_debounce_ms: SERVER_FIX_DEBOUNCE.as_millis() as u64,
            title_max_chars: TITLE_MAX_CHARS,
            track_changes: true,
        }
    }
}

impl SyncConfig {
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Read a `.ron` config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    pub fn diff_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.diff_ack_timeout_ms)
    }

    pub fn version_check_timeout(&self) -> Duration {
        Duration::from_millis(self.version_check_timeout_ms)
    }

    pub fn server_fix_debounce(&self) -> Duration {
        Duration::from_millis(self.server_fix_debounce_ms)
    }
}

/// Error type for config loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.diff_ack_timeout(), Duration::from_secs(8));
        assert_eq!(config.version_check_timeout(), Duration::from_secs(1));
        assert_eq!(config.server_fix_debounce(), Duration::from_millis(500));
        assert!(config.track_changes);
    }

    #[test]
    fn test_partial_ron() {
        let config = SyncConfig::from_ron("(server_fix_debounce_ms: 250, track_changes: false)").unwrap();
        assert_eq!(config.server_fix_debounce(), Duration::from_millis(250));
        assert!(!config.track_changes);
        assert_eq!(config.diff_ack_timeout_ms, 8000);
    }

    #[test]
    fn test_bad_ron() {
        let err = SyncConfig::from_ron("(diff_ack_timeout_ms: \"soon\")").unwrap_err();
        assert!(matches!(err, ConfigError::Ron(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = SyncConfig::load("/nonexistent/quire-sync.ron").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
