//! Domain layer for the RPC correlator.

pub mod call_id;
pub mod config;
pub mod envelope;
pub mod pending;
pub mod response;
pub mod topics;

pub use call_id::CallId;
pub use config::RpcConfig;
pub use envelope::{normalize_id, RequestEnvelope, ResponseEnvelope, StatusEnvelope};
pub use pending::{OnceCallback, PendingCall};
pub use response::{CallResponse, StatusEvent};
pub use topics::{is_resolved, DeviceTopics, InboundKind, WILDCARD};
