//! Adapters (I/O implementations) for the transport subsystem.

pub mod mqtt;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use mqtt::MqttTransport;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::{MemoryTransport, PublishedMessage, Responder};
