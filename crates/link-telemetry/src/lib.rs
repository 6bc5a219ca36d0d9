//! # Link Telemetry
//!
//! Structured logging for Printer-Link processes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use link_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&TelemetryConfig::from_env())?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PL_LOG_LEVEL` / `RUST_LOG` | `info` | Level filter |
//! | `PL_JSON_LOGS` | `false` | JSON output |
//! | `PL_LOG_SOURCE` | `false` | Include file and line |
//! | `PL_SERVICE_NAME` | `printer-link` | Service name |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging, LoggingGuard};

use thiserror::Error;

/// Logging initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}
