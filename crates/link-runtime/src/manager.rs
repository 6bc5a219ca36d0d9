//! # Connection Manager
//!
//! One correlator per device key. Devices never share a transport, an
//! identity or a status slot.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use pl_01_transport::{FailureCallback, MqttTransport, Transport, TransportConfig};
use pl_02_rpc::{DeviceApi, RpcCorrelator, RpcResult};
use pl_03_web_bridge::{EchoFactory, MachineFactory, ResponseSink, WebBridge};
use tracing::{info, warn};

use crate::config::LinkConfig;

/// Builds the transport for a new device connection.
pub type TransportFactory = Arc<dyn Fn(&TransportConfig) -> Arc<dyn Transport> + Send + Sync>;

/// Owns the live device connections.
pub struct ConnectionManager {
    config: LinkConfig,
    transports: TransportFactory,
    links: Mutex<HashMap<String, Arc<RpcCorrelator>>>,
}

impl ConnectionManager {
    /// Manager that talks MQTT.
    pub fn new(config: LinkConfig) -> Self {
        Self::with_transport_factory(
            config,
            Arc::new(|transport: &TransportConfig| {
                Arc::new(MqttTransport::new(transport.clone())) as Arc<dyn Transport>
            }),
        )
    }

    pub fn with_transport_factory(config: LinkConfig, transports: TransportFactory) -> Self {
        Self {
            config,
            transports,
            links: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Connect the device under `key`, creating its correlator on first use.
    ///
    /// `on_failure` runs once if the connection is lost and not restored
    /// within the reconnect grace period.
    pub async fn connect(
        &self,
        key: &str,
        identity_hint: Option<&str>,
        on_failure: Option<FailureCallback>,
    ) -> RpcResult<Arc<RpcCorrelator>> {
        let correlator = self.get_or_create(key);
        if let Some(callback) = on_failure {
            correlator.set_connection_failure_callback(callback);
        }

        let hint = identity_hint.or(self.config.device_sn.as_deref());
        correlator.connect(hint).await?;
        info!(device = %key, "Device link up");
        Ok(correlator)
    }

    /// Disconnect `key`, keeping its correlator for a later reconnect.
    pub async fn disconnect(&self, key: &str) -> RpcResult {
        let Some(correlator) = self.get(key) else {
            return Ok(());
        };
        correlator.disconnect().await
    }

    /// Disconnect and forget `key`.
    pub async fn remove(&self, key: &str) -> RpcResult {
        let Some(correlator) = self.links.lock().remove(key) else {
            return Ok(());
        };
        let result = correlator.disconnect().await;
        if let Err(e) = &result {
            warn!(device = %key, error = %e, "Disconnect on remove failed");
        }
        info!(device = %key, "Device link removed");
        result
    }

    /// Disconnect every device.
    pub async fn shutdown(&self) {
        let keys: Vec<String> = self.links.lock().keys().cloned().collect();
        for key in keys {
            let _ = self.remove(&key).await;
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<RpcCorrelator>> {
        self.links.lock().get(key).cloned()
    }

    pub fn device_api(&self, key: &str) -> Option<DeviceApi> {
        self.get(key).map(DeviceApi::new)
    }

    /// Web bridge serving the built-in commands against device `key`.
    pub fn web_bridge(&self, key: &str, sink: Arc<dyn ResponseSink>) -> WebBridge {
        WebBridge::new(&self.config.bridge, sink)
            .with_factory(EchoFactory)
            .with_factory(MachineFactory::new(DeviceApi::new(self.get_or_create(key))))
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.links.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.links.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.lock().is_empty()
    }

    fn get_or_create(&self, key: &str) -> Arc<RpcCorrelator> {
        let mut links = self.links.lock();
        links
            .entry(key.to_string())
            .or_insert_with(|| {
                let transport = (self.transports)(&self.config.transport());
                Arc::new(RpcCorrelator::new(transport, self.config.rpc.clone()))
            })
            .clone()
    }
}
