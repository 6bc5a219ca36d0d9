//! # PL-03 Web Bridge
//!
//! Serves commands from the embedded web UI. Each inbound message becomes
//! a command instance that lives in a timeout registry until it finishes
//! itself or expires.
//!
//! ## Message Shapes
//!
//! | Direction | Shape |
//! |-----------|-------|
//! | In  | `{"header": {..}, "payload": {"cmd", "params", "event_id"?}}` |
//! | Out | `{"header": {..}, "payload": {"code", "msg", "data"}}` |
//!
//! ## Lifetimes
//!
//! - Without `event_id`: expires after `instance_timeout` (default 30s) and
//!   answers `{code: 1, msg: "timeout"}`.
//! - With `event_id`: never expires; later responses carry
//!   `{"event_id": ..}` as header.
//!
//! ## Built-in Commands
//!
//! | Command | Instance |
//! |---------|----------|
//! | `test` | [`EchoInstance`] |
//! | `sw_SendGCodes` | [`MachineInstance`] |
//! | `sw_GetMachineState` | [`MachineInstance`] |
//! | `sw_GetPrinterInfo` | [`MachineInstance`] |

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod instance;
pub mod instances;
pub mod ports;
pub mod registry;
pub mod service;

pub use adapters::ChannelSink;
pub use domain::{codes, BridgeConfig, InstanceId, WebMessage, WebResponse};
pub use error::BridgeError;
pub use instance::InstanceContext;
pub use instances::{EchoFactory, EchoInstance, MachineFactory, MachineInstance};
pub use ports::{CommandInstance, InstanceFactory, ResponseSink};
pub use registry::{InstanceHandle, InstanceRegistry};
pub use service::WebBridge;
