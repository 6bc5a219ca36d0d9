//! Correlator configuration.

use std::time::Duration;

use pl_01_transport::{ConfigError, QoS};
use serde::{Deserialize, Serialize};

/// Timeouts and delivery settings for one correlator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Default time a call waits for its response
    #[serde(with = "humantime_serde")]
    pub call_timeout: Duration,
    /// Bound on waiting for the remote identity before a call fails
    #[serde(with = "humantime_serde")]
    pub identity_wait: Duration,
    /// Cadence of the pending-call sweep
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// QoS for every subscription and publish
    #[serde(skip)]
    pub qos: QoS,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(80),
            identity_wait: Duration::from_secs(6),
            sweep_interval: Duration::from_secs(1),
            qos: QoS::ExactlyOnce,
        }
    }
}

impl RpcConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.call_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout("call_timeout cannot be 0".into()));
        }
        if self.identity_wait.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "identity_wait cannot be 0".into(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "sweep_interval cannot be 0".into(),
            ));
        }
        Ok(())
    }
}
