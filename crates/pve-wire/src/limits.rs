//! Bounds applied when parsing wire values and polling tasks.

use std::time::Duration;

/// Maximum length of a single wire string handed to the token-list parser.
pub const MAX_WIRE_STRING_LEN: usize = 64 * 1024;

/// Maximum number of entries in one token list.
pub const MAX_TOKEN_LIST_ENTRIES: usize = 256;

/// Poll interval used when the caller does not choose one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Smallest poll interval the coordinator accepts.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);
