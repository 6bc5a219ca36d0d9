//! Error types for the RPC correlator.

use pl_01_transport::{ConfigError, TransportError};
use thiserror::Error;

/// Why a call, forward or status operation could not be dispatched.
///
/// Outcomes of a dispatched call (data, remote error, timeout) are never
/// errors; they reach the caller as a [`CallResponse`](crate::CallResponse).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    /// Transport connect or subscribe failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// No `<sn>/notification` arrived within the identity wait.
    #[error("Remote identity not resolved")]
    IdentityUnresolved,

    /// Publishing the request envelope failed.
    #[error("Publish failed: {0}")]
    Publish(TransportError),

    /// Request envelope could not be encoded.
    #[error("Encode error: {0}")]
    Encode(String),

    /// Transport is not connected.
    #[error("Not connected")]
    NotConnected,

    /// Caller-built request is unusable (e.g. missing id).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RpcError {
    /// Map a publish failure, keeping `NotConnected` distinct.
    pub fn from_publish(error: TransportError) -> Self {
        match error {
            TransportError::NotConnected => Self::NotConnected,
            other => Self::Publish(other),
        }
    }
}

/// Result alias for correlator operations.
pub type RpcResult<T = ()> = Result<T, RpcError>;
