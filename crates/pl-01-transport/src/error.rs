//! Error types for the transport subsystem.

use thiserror::Error;

/// Errors reported by a [`Transport`](crate::Transport) operation.
///
/// Every failure of the underlying client library is converted into one of
/// these at the port boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Operation requires an established connection.
    #[error("Not connected to broker")]
    NotConnected,

    /// Broker did not acknowledge the connection in time.
    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),

    /// Broker refused the connection.
    #[error("Broker rejected connection: {0}")]
    Rejected(String),

    /// Client library failure.
    #[error("Client error: {0}")]
    Client(String),

    /// Operation did not complete within the operation timeout.
    #[error("Operation timed out: {0}")]
    Timeout(&'static str),
}

/// Invalid configuration values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid broker address: {0}")]
    InvalidAddress(String),

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("Invalid backoff: {0}")]
    InvalidBackoff(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Result alias for transport operations.
pub type TransportResult<T = ()> = Result<T, TransportError>;
