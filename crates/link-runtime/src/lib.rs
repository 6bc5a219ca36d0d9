//! # Printer-Link Runtime
//!
//! Composes the link per device:
//!
//! ```text
//! LinkConfig ──► ConnectionManager ──┬─► MqttTransport ─► RpcCorrelator ─► DeviceApi
//!                                    └─► WebBridge (echo, machine commands)
//! ```
//!
//! The `printer-link` binary connects to one device, performs one call
//! and prints the rendered response.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod manager;

pub use config::LinkConfig;
pub use manager::{ConnectionManager, TransportFactory};
