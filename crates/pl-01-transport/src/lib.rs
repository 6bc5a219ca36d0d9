//! # Printer-Link Transport (pl-01)
//!
//! Publish/subscribe connection to the broker that carries the device
//! conversation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  connect/subscribe/publish  ┌──────────────────┐
//! │ RpcCorrelator│ ──────────────────────────► │ Transport (port) │
//! │   (pl-02)    │ ◄────────────────────────── │                  │
//! └──────────────┘   EventSink(TransportEvent) └────────┬─────────┘
//!                                                       │
//!                                  ┌────────────────────┼───────────────┐
//!                                  ▼                                    ▼
//!                          MqttTransport (rumqttc)          MemoryTransport (tests)
//!                                  │
//!                                  └── ConnectionWatchdog (grace timer)
//! ```
//!
//! ## Connection State
//!
//! `Disconnected → Connecting → Connected → Reconnecting → Connected`.
//! A loss that is not repaired within the grace period moves the state to
//! `Disconnected` and fires the connection-failure callback once, while
//! the client keeps retrying in the background.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod watchdog;

pub use adapters::MqttTransport;
pub use domain::{
    generate_client_id, topic_matches, Backoff, BrokerAddress, BrokerConfig, ConnectionState,
    QoS, ReconnectConfig, TransportConfig, TransportEvent,
};
pub use error::{ConfigError, TransportError, TransportResult};
pub use ports::{EventSink, FailureCallback, Transport};
pub use watchdog::ConnectionWatchdog;

#[cfg(any(test, feature = "test-utils"))]
pub use adapters::{MemoryTransport, PublishedMessage, Responder};
