//! Transport configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;

/// Default MQTT port.
pub const DEFAULT_PORT: u16 = 1883;

/// Transport configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub broker: BrokerConfig,
    pub reconnect: ReconnectConfig,
}

impl TransportConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.broker.validate()?;
        self.reconnect.validate()
    }
}

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker host name or IP
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Prefix of the generated client identifier
    pub client_id_prefix: String,
    /// MQTT keep-alive interval
    #[serde(with = "humantime_serde")]
    pub keep_alive: Duration,
    /// Start every session clean
    pub clean_session: bool,
    /// Time allowed for the broker to acknowledge a connect
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Time allowed for subscribe/unsubscribe/publish/disconnect
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,
    /// Capacity of the client request channel
    pub channel_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            client_id_prefix: "orca_".to_string(),
            keep_alive: Duration::from_secs(20),
            clean_session: true,
            connect_timeout: Duration::from_secs(6),
            operation_timeout: Duration::from_secs(6),
            channel_capacity: 64,
        }
    }
}

impl BrokerConfig {
    /// Settings for `address`, everything else default.
    pub fn for_address(address: &BrokerAddress) -> Self {
        Self {
            host: address.host.clone(),
            port: address.port,
            ..Self::default()
        }
    }

    pub fn address(&self) -> BrokerAddress {
        BrokerAddress {
            host: self.host.clone(),
            port: self.port,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidAddress("host cannot be empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidAddress("port cannot be 0".into()));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "connect_timeout cannot be 0".into(),
            ));
        }
        if self.operation_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "operation_timeout cannot be 0".into(),
            ));
        }
        if self.keep_alive < Duration::from_secs(5) {
            return Err(ConfigError::InvalidTimeout(
                "keep_alive must be at least 5s".into(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "channel_capacity",
                value: "0".into(),
            });
        }
        Ok(())
    }
}

/// Reconnect policy after an unsolicited connection loss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// First retry delay
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,
    /// Retry delay cap
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
    /// Time after a loss before the failure callback fires
    #[serde(with = "humantime_serde")]
    pub grace_period: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
            grace_period: Duration::from_secs(10),
        }
    }
}

impl ReconnectConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_backoff.is_zero() {
            return Err(ConfigError::InvalidBackoff(
                "initial_backoff cannot be 0".into(),
            ));
        }
        if self.max_backoff < self.initial_backoff {
            return Err(ConfigError::InvalidBackoff(
                "max_backoff must be >= initial_backoff".into(),
            ));
        }
        if self.grace_period.is_zero() {
            return Err(ConfigError::InvalidTimeout("grace_period cannot be 0".into()));
        }
        Ok(())
    }
}

/// Broker `host:port`.
///
/// Parses `host`, `host:port` and `mqtt://host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

impl FromStr for BrokerAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let rest = trimmed
            .strip_prefix("mqtt://")
            .or_else(|| trimmed.strip_prefix("tcp://"))
            .unwrap_or(trimmed)
            .trim_end_matches('/');

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidAddress(s.to_string()))?;
                (host, port)
            }
            None => (rest, DEFAULT_PORT),
        };

        if host.is_empty() || port == 0 {
            return Err(ConfigError::InvalidAddress(s.to_string()));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// `prefix` followed by the first 8 characters of a fresh v4 UUID.
pub fn generate_client_id(prefix: &str) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, &uuid[..8])
}
