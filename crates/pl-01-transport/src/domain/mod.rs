//! Domain layer for the transport subsystem.
//!
//! Pure types: connection state, inbound events, QoS, backoff policy,
//! topic matching and configuration. No I/O.

pub mod backoff;
pub mod config;
pub mod state;
pub mod topic;

pub use backoff::Backoff;
pub use config::{generate_client_id, BrokerAddress, BrokerConfig, ReconnectConfig, TransportConfig};
pub use state::{ConnectionState, QoS, TransportEvent};
pub use topic::topic_matches;
