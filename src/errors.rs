// Typed errors at the console's module boundaries
//
// Startup and configuration paths use anyhow; these enums are what the
// bus, the input source and module option handling hand back so callers
// can match on the failure kind.

use thiserror::Error;

use crate::bus::ClientId;

/// Failures of the message bus and the console render queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("client {0} is already registered with the message bus")]
    DuplicateRegistration(ClientId),

    #[error("client {0} is not registered with the message bus")]
    UnknownClient(ClientId),

    #[error("no client is registered with the message bus")]
    NoClients,

    #[error("queue stayed full for {waited_ms}ms; message dropped")]
    Timeout { waited_ms: u64 },

    #[error("queue is closed")]
    Closed,
}

/// Failures of the interactive input source.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("failed to initialise line editor: {0}")]
    Editor(String),

    #[error("failed to read input: {0}")]
    Read(String),

    #[error("history file {path}: {reason}")]
    History { path: String, reason: String },
}

/// Option edits rejected by a loaded module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    #[error("invalid module option: {0}")]
    UnknownOption(String),

    #[error("invalid agent identifier: {0}")]
    InvalidAgent(String),

    #[error("missing value for option {0}")]
    MissingValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_error_messages() {
        let id = ClientId::new();
        let err = BusError::DuplicateRegistration(id);
        assert!(err.to_string().contains("already registered"));
        assert!(err.to_string().contains(&id.to_string()));

        let err = BusError::Timeout { waited_ms: 250 };
        assert_eq!(err.to_string(), "queue stayed full for 250ms; message dropped");
    }

    #[test]
    fn test_module_error_messages() {
        let err = ModuleError::UnknownOption("Bogus".to_string());
        assert_eq!(err.to_string(), "invalid module option: Bogus");
    }
}
