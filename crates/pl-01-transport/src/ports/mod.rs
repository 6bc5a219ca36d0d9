//! Ports (trait definitions) for the transport subsystem.

pub mod transport;

pub use transport::{EventSink, FailureCallback, Transport};
