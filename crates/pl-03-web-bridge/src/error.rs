//! Error types for the web-command bridge.

use thiserror::Error;

/// Why an inbound web message was not turned into an instance.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Malformed message: {0}")]
    Parse(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Unsupported command: {0}")]
    UnsupportedCommand(String),
}
