//! Simulated device: a memory transport, a correlator bound to it, and
//! helpers that play the device side of the protocol.

use std::sync::Arc;
use parking_lot::Mutex;
use pl_01_transport::{MemoryTransport, PublishedMessage, Transport};
use pl_02_rpc::{CallResponse, RpcConfig, RpcCorrelator, RpcResult};
use serde_json::{json, Value};

/// Correlator plus the transport it talks through.
pub struct DeviceHarness {
    pub transport: Arc<MemoryTransport>,
    pub correlator: Arc<RpcCorrelator>,
}

impl DeviceHarness {
    /// Must be called inside a runtime.
    pub fn new() -> Self {
        Self::with_transport(MemoryTransport::new())
    }

    pub fn with_transport(transport: MemoryTransport) -> Self {
        let transport = Arc::new(transport);
        let correlator = Arc::new(RpcCorrelator::new(
            transport.clone() as Arc<dyn Transport>,
            RpcConfig::default(),
        ));
        Self {
            transport,
            correlator,
        }
    }

    /// Harness already connected as `sn`.
    pub async fn connected(sn: &str) -> RpcResult<Self> {
        let harness = Self::new();
        harness.correlator.connect(Some(sn)).await?;
        Ok(harness)
    }

    /// Announce `sn` the way a device does after boot.
    pub fn announce(&self, sn: &str) -> bool {
        self.transport
            .inject(&format!("{}/notification", sn), b"{}".to_vec())
    }

    /// Request id and body of the last publish.
    pub fn last_request(&self) -> Option<(String, Value)> {
        let message = self.transport.last_published()?;
        let body: Value = serde_json::from_slice(&message.payload).ok()?;
        let id = body["id"].as_str()?.to_string();
        Some((id, body))
    }

    /// Answer request `id` as device `sn`.
    pub fn reply(&self, sn: &str, id: &str, body: Value) -> bool {
        let mut reply = body;
        reply["id"] = json!(id);
        self.transport
            .inject(&format!("{}/response", sn), reply.to_string().into_bytes())
    }

    /// Device `sn` answers every request with `result` computed from it.
    pub fn auto_reply(&self, sn: &'static str, result: impl Fn(&Value) -> Value + Send + Sync + 'static) {
        self.transport
            .set_responder(Arc::new(move |message: &PublishedMessage| {
                let Ok(body) = serde_json::from_slice::<Value>(&message.payload) else {
                    return Vec::new();
                };
                let reply = json!({
                    "id": body["id"],
                    "method": body["method"],
                    "result": result(&body),
                });
                vec![(format!("{}/response", sn), reply.to_string().into_bytes())]
            }));
    }
}

impl Default for DeviceHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Records every outcome a call delivers.
#[derive(Clone, Default)]
pub struct Outcomes {
    responses: Arc<Mutex<Vec<CallResponse>>>,
    timeouts: Arc<Mutex<usize>>,
}

impl Outcomes {
    pub fn on_success(&self) -> impl FnOnce(CallResponse) + Send + 'static {
        let responses = self.responses.clone();
        move |response| responses.lock().push(response)
    }

    pub fn on_timeout(&self) -> impl FnOnce() + Send + 'static {
        let timeouts = self.timeouts.clone();
        move || *timeouts.lock() += 1
    }

    pub fn responses(&self) -> Vec<CallResponse> {
        self.responses.lock().clone()
    }

    pub fn timeouts(&self) -> usize {
        *self.timeouts.lock()
    }

    /// Terminal outcomes delivered so far.
    pub fn total(&self) -> usize {
        self.responses.lock().len() + self.timeouts()
    }
}
