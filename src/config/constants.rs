// Project-wide constants
//
// Centralised here so identifiers, paths and queue sizing have one
// source of truth. Import via `use crate::config::constants::*;`.

use uuid::Uuid;

/// Console version reported by `version` and `help`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reserved agent identifier meaning "every agent".
///
/// `queue all <command>` is rewritten to this id before forwarding.
pub const BROADCAST_AGENT_ID: Uuid = Uuid::from_u128(u128::MAX);

/// Directory under the home directory holding config and history.
pub const CONFIG_DIR_NAME: &str = ".cairn";

/// Config file name inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Line history file name inside [`CONFIG_DIR_NAME`].
pub const HISTORY_FILE_NAME: &str = "history";

/// Default module definition directory, relative to the working directory.
pub const DEFAULT_MODULES_DIR: &str = "data/modules";

/// Default capacity of the client inbox and the render queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default time a publish may wait on a full queue before giving up.
pub const DEFAULT_PUBLISH_TIMEOUT_MS: u64 = 250;

/// Default prompt name shown before the context marker.
pub const DEFAULT_PROMPT_NAME: &str = "cairn";

/// Question asked before the console exits.
pub const QUIT_QUESTION: &str = "Are you sure you want to exit the server?";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_id_is_all_ones() {
        assert_eq!(
            BROADCAST_AGENT_ID.to_string(),
            "ffffffff-ffff-ffff-ffff-ffffffffffff"
        );
    }
}
