//! # Link Configuration
//!
//! Everything one device connection needs, with defaults for every value
//! and environment overrides for the common ones.

use std::time::Duration;

use pl_01_transport::{BrokerConfig, ConfigError, ReconnectConfig, TransportConfig};
use pl_02_rpc::RpcConfig;
use pl_03_web_bridge::BridgeConfig;
use serde::{Deserialize, Serialize};

/// Complete configuration of a device link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub broker: BrokerConfig,
    pub reconnect: ReconnectConfig,
    pub rpc: RpcConfig,
    pub bridge: BridgeConfig,
    /// Device serial number, when known up front
    pub device_sn: Option<String>,
}

impl LinkConfig {
    /// Defaults overridden from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PL_BROKER_HOST`: broker host (default: localhost)
    /// - `PL_BROKER_PORT`: broker port (default: 1883)
    /// - `PL_DEVICE_SN`: device serial number (default: discovered)
    /// - `PL_CALL_TIMEOUT`: default call timeout, e.g. `80s`
    /// - `PL_RECONNECT_GRACE`: time to reconnect before giving up, e.g. `10s`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(host) = lookup("PL_BROKER_HOST") {
            config.broker.host = host;
        }
        if let Some(port) = lookup("PL_BROKER_PORT") {
            config.broker.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PL_BROKER_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(sn) = lookup("PL_DEVICE_SN").filter(|sn| !sn.is_empty()) {
            config.device_sn = Some(sn);
        }
        if let Some(value) = lookup("PL_CALL_TIMEOUT") {
            config.rpc.call_timeout = parse_duration("PL_CALL_TIMEOUT", &value)?;
        }
        if let Some(value) = lookup("PL_RECONNECT_GRACE") {
            config.reconnect.grace_period = parse_duration("PL_RECONNECT_GRACE", &value)?;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.broker.validate()?;
        self.reconnect.validate()?;
        self.rpc.validate()?;
        self.bridge.validate()
    }

    /// Transport half of the configuration.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            broker: self.broker.clone(),
            reconnect: self.reconnect.clone(),
        }
    }
}

fn parse_duration(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|_| {
        ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }
    })
}
