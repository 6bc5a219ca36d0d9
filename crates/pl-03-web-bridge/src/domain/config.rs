//! Bridge configuration.

use std::time::Duration;

use pl_01_transport::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Lifetime of an instance without an event id
    #[serde(with = "humantime_serde")]
    pub instance_timeout: Duration,
    /// Cadence of the instance sweep
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            instance_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(1),
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instance_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "instance_timeout cannot be 0".into(),
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
