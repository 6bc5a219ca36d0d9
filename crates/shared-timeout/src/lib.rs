//! # Shared Timeout - Expiring Key/Value Registry
//!
//! A generic, thread-safe registry where every entry carries a deadline
//! (or never expires) and is reclaimed by a background sweep that fires
//! the value's timeout action exactly once.
//!
//! ## Lifecycle
//!
//! ```text
//!   add / add_infinite ──► live ──► get_and_remove / remove ──► gone (no action)
//!                           │
//!                           └─(deadline passed)─► sweep or lazy eviction ──► on_timeout()
//! ```
//!
//! ## Correlation Guarantee
//!
//! `get_and_remove` and the sweep take the same lock, so for any key at
//! most one of {"value handed to a getter", "timeout action fired"} happens.
//! This is the primitive used for request/response correlation.
//!
//! ## Timeout Actions
//!
//! Values opt into a timeout action through [`TimeoutAction`]:
//!
//! - a type implements it directly (method hook),
//! - [`WithTimeout`] wraps any value with a callback field,
//! - `Arc<T>` forwards to a by-reference [`TimeoutHook`] (owning handle),
//! - plain data types implement it as a no-op (silent eviction).

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod action;
pub mod registry;

pub use action::{TimeoutAction, TimeoutHook, WithTimeout};
pub use registry::{Deadline, RegistryStats, TimeoutRegistry};

use std::time::Duration;

/// Timeout substituted when an entry is added with a zero timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Cadence of the background sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
