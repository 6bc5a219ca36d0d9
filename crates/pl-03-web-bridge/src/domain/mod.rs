//! Domain layer for the web-command bridge.

pub mod config;
pub mod message;

pub use config::BridgeConfig;
pub use message::{codes, InstanceId, WebMessage, WebResponse};
