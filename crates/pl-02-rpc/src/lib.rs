//! # Printer-Link RPC (pl-02)
//!
//! Request/response correlation over a publish/subscribe transport.
//!
//! ## Topics
//!
//! | Topic | Direction | Content |
//! |-------|-----------|---------|
//! | `<sn>/request` | out | `{jsonrpc, method, params, id?}` |
//! | `<sn>/response` | in | `{id, result \| error, method?}` |
//! | `<sn>/status` | in | `{params}` or `{result: {status}}` |
//! | `<sn>/notification` | in | announces `<sn>` |
//!
//! ## Guarantees
//!
//! - A call that expects a response resolves exactly once: data, remote
//!   error or timeout. A response arriving after the timeout is dropped.
//! - A call made before any identity is known waits a bounded time for
//!   one, then fails without publishing.
//! - One correlator serves one device; it owns its transport binding,
//!   identity and status slot.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod api;
pub mod domain;
pub mod error;
pub mod service;

pub use api::{methods, objects_params, DeviceApi, ObjectTarget};
pub use domain::{
    CallId, CallResponse, DeviceTopics, OnceCallback, PendingCall, RequestEnvelope,
    ResponseEnvelope, RpcConfig, StatusEnvelope, StatusEvent,
};
pub use error::{RpcError, RpcResult};
pub use service::{RpcCorrelator, StatusCallback};
