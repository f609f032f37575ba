//! Sync protocol defaults.
//!
//! Each is overridable through [`SyncConfig`](crate::SyncConfig).

use std::time::Duration;

/// How long a sent diff may go unacknowledged before the session assumes
/// it was lost and checks its version with the server.
pub const DIFF_ACK_TIMEOUT: Duration = Duration::from_secs(8);

/// A version check with no answer is abandoned after this long, so a new
/// one may be sent.
pub const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(1);

/// After a server fix, local changes wait this long so collaborators' edits
/// arriving at the same moment are merged first.
pub const SERVER_FIX_DEBOUNCE: Duration = Duration::from_millis(500);

/// Longest title sent with a diff, in characters.
pub const TITLE_MAX_CHARS: usize = 255;

/// Which editor a selection update refers to.
pub const MAIN_EDITOR: &str = "main";
