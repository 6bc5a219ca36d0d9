//! # Printer-Link Test Suite
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Simulated device over the memory transport
//! └── integration/      # End-to-end scenarios
//!     ├── calls.rs      # Resolution, timeout, late arrival
//!     ├── identity.rs   # Discovery and gating
//!     ├── reconnect.rs  # Watchdog grace period
//!     ├── status.rs     # Status feed
//!     └── web_bridge.rs # Web commands against a device
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pl-tests
//! cargo test -p pl-tests integration::calls::
//! cargo bench -p pl-tests
//! ```

pub mod fixtures;
pub mod integration;
