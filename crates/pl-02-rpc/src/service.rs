//! # RPC Correlator
//!
//! Request/response correlation on top of one [`Transport`].
//!
//! Flow:
//! 1. `call()` registers a [`PendingCall`] under a fresh [`CallId`]
//! 2. It waits (bounded) for the remote identity, then publishes the
//!    envelope to `<sn>/request`
//! 3. The transport's I/O task hands `<sn>/response` to `dispatch`, which
//!    takes the pending call out of the registry and completes it
//! 4. If nothing arrives in time the registry sweep fires the timeout path
//!
//! Steps 3 and 4 race on the same registry lock; exactly one wins.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use pl_01_transport::{FailureCallback, Transport, TransportEvent};
use serde_json::Value;
use shared_timeout::{RegistryStats, TimeoutRegistry};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use crate::domain::{
    is_resolved, normalize_id, CallId, CallResponse, DeviceTopics, InboundKind, OnceCallback,
    PendingCall, RequestEnvelope, ResponseEnvelope, RpcConfig, StatusEnvelope, StatusEvent,
};
use crate::error::{RpcError, RpcResult};

/// Receives every status event while the slot is installed.
pub type StatusCallback = Arc<dyn Fn(StatusEvent) + Send + Sync>;

/// State reachable from the transport's I/O task.
struct Inner {
    pending: TimeoutRegistry<String, PendingCall>,
    identity: watch::Sender<Option<String>>,
    status: Mutex<Option<StatusCallback>>,
}

impl Inner {
    fn dispatch(&self, topic: &str, payload: &[u8]) {
        match InboundKind::classify(topic) {
            InboundKind::Response => self.on_response(payload),
            InboundKind::Status => self.on_status(payload),
            InboundKind::Notification { identity } => self.on_notification(identity),
            InboundKind::Other => debug!(topic = %topic, "Ignoring message on unknown topic"),
        }
    }

    fn on_response(&self, payload: &[u8]) {
        let Some(envelope) = ResponseEnvelope::parse(payload) else {
            debug!("Dropping response without usable id");
            return;
        };

        let Some(pending) = self.pending.get_and_remove(envelope.id.as_str()) else {
            // Unknown id, or the call already timed out.
            debug!(call_id = %envelope.id, "Dropping late or unknown response");
            return;
        };

        debug!(call_id = %envelope.id, method = %pending.method, "Response matched");
        let response = if pending.raw {
            CallResponse::Raw(envelope.body)
        } else {
            CallResponse::from_envelope(envelope)
        };
        pending.complete(response);
    }

    fn on_status(&self, payload: &[u8]) {
        let Some(status) = StatusEnvelope::parse(payload) else {
            debug!("Dropping status without params or result.status");
            return;
        };
        let Some(callback) = self.status.lock().clone() else {
            return;
        };

        let method = match status.method {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        callback(StatusEvent::Update {
            data: status.data,
            method,
        });
    }

    fn on_notification(&self, identity: &str) {
        if !is_resolved(identity) {
            return;
        }
        let changed = self.identity.send_if_modified(|current| {
            if current.as_deref() == Some(identity) {
                false
            } else {
                *current = Some(identity.to_string());
                true
            }
        });
        if changed {
            info!(sn = %identity, "Remote identity discovered");
        }
    }
}

/// Correlates calls and responses for exactly one device connection.
pub struct RpcCorrelator {
    transport: Arc<dyn Transport>,
    config: RpcConfig,
    inner: Arc<Inner>,
}

impl RpcCorrelator {
    /// Bind a correlator to `transport` and install its event sink.
    ///
    /// Must be called inside a tokio runtime so the pending-call sweep runs.
    pub fn new(transport: Arc<dyn Transport>, config: RpcConfig) -> Self {
        let (identity, _) = watch::channel(None);
        let inner = Arc::new(Inner {
            pending: TimeoutRegistry::with_config(config.call_timeout, config.sweep_interval),
            identity,
            status: Mutex::new(None),
        });

        let sink_inner: Weak<Inner> = Arc::downgrade(&inner);
        transport.set_event_sink(Arc::new(move |event| {
            let Some(inner) = sink_inner.upgrade() else {
                return;
            };
            match event {
                TransportEvent::Message { topic, payload } => inner.dispatch(&topic, &payload),
                TransportEvent::Connected => debug!("Transport connected"),
                TransportEvent::ConnectionLost { cause } => {
                    warn!(cause = %cause, "Transport connection lost")
                }
            }
        }));

        Self {
            transport,
            config,
            inner,
        }
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect and subscribe to the notification and response topics.
    ///
    /// An existing session is closed first. A non-empty `identity_hint`
    /// pre-seeds the identity; otherwise the wildcard prefix is used until
    /// a notification reveals it.
    pub async fn connect(&self, identity_hint: Option<&str>) -> RpcResult {
        if self.transport.is_connected() {
            if let Err(e) = self.transport.disconnect().await {
                warn!(error = %e, "Disconnect before reconnect failed");
            }
        }
        self.inner.identity.send_replace(None);

        self.transport.connect().await?;

        let topics = match identity_hint.filter(|sn| is_resolved(sn)) {
            Some(sn) => {
                self.inner.identity.send_replace(Some(sn.to_string()));
                DeviceTopics::new(sn)
            }
            None => DeviceTopics::wildcard(),
        };

        if let Err(e) = self.subscribe_device_topics(&topics).await {
            self.inner.identity.send_replace(None);
            if let Err(close) = self.transport.disconnect().await {
                warn!(error = %close, "Disconnect after failed subscribe failed");
            }
            return Err(e);
        }

        info!(prefix = %topics.prefix(), "Correlator connected");
        Ok(())
    }

    async fn subscribe_device_topics(&self, topics: &DeviceTopics) -> RpcResult {
        let qos = self.config.qos;
        self.transport
            .subscribe(&topics.notification(), qos)
            .await?;
        self.transport.subscribe(&topics.response(), qos).await?;
        Ok(())
    }

    /// Disconnect the transport and forget the identity.
    ///
    /// Pending calls stay registered and resolve through their timeout.
    /// The status slot stays installed until [`unsubscribe_status`](Self::unsubscribe_status).
    pub async fn disconnect(&self) -> RpcResult {
        self.inner.identity.send_replace(None);
        self.transport.disconnect().await?;
        info!(pending = self.inner.pending.len(), "Correlator disconnected");
        Ok(())
    }

    pub fn set_connection_failure_callback(&self, callback: FailureCallback) {
        self.transport.set_connection_failure_callback(callback);
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub fn identity(&self) -> Option<String> {
        self.inner.identity.borrow().clone()
    }

    /// Receiver that observes identity changes.
    pub fn watch_identity(&self) -> watch::Receiver<Option<String>> {
        self.inner.identity.subscribe()
    }

    /// Wait up to the configured bound for the identity.
    pub async fn wait_for_identity(&self) -> Option<String> {
        let mut rx = self.inner.identity.subscribe();
        let resolved = rx.wait_for(|identity| identity.is_some());
        let identity = match tokio::time::timeout(self.config.identity_wait, resolved).await {
            Ok(Ok(identity)) => identity.clone(),
            _ => None,
        };
        identity
    }

    // =========================================================================
    // Calls
    // =========================================================================

    /// Publish `method` and route its outcome to the callbacks.
    ///
    /// The identity is resolved first. With `needs_response`, the call is
    /// then registered before publishing and exactly one of `on_success` /
    /// `on_timeout` runs later. An `Err`
    /// means nothing was published and neither callback will run.
    /// A zero `timeout` uses the configured call timeout.
    pub async fn call(
        &self,
        method: &str,
        params: Value,
        needs_response: bool,
        on_success: impl FnOnce(CallResponse) + Send + 'static,
        on_timeout: impl FnOnce() + Send + 'static,
        timeout: Duration,
    ) -> RpcResult {
        let id = CallId::new().to_string();
        let envelope = RequestEnvelope::new(method, params, needs_response.then(|| id.clone()));
        let bytes = envelope
            .to_bytes()
            .map_err(|e| RpcError::Encode(e.to_string()))?;

        let sn = self.resolve_identity(&id, method).await?;

        if needs_response {
            self.inner.pending.add(
                id.clone(),
                PendingCall::new(method, on_success, on_timeout),
                timeout,
            );
        }

        self.publish_request(&sn, &id, method, bytes).await
    }

    /// Awaitable form of [`call`](Self::call) with `needs_response`.
    pub async fn request(&self, method: &str, params: Value, timeout: Duration) -> CallResponse {
        let (tx, rx) = oneshot::channel();
        let once = OnceCallback::new(move |response| {
            let _ = tx.send(response);
        });
        let on_timeout = once.clone();

        let dispatched = self
            .call(
                method,
                params,
                true,
                move |response| {
                    once.fire(response);
                },
                move || {
                    on_timeout.fire(CallResponse::Timeout);
                },
                timeout,
            )
            .await;

        if let Err(e) = dispatched {
            debug!(method = %method, error = %e, "Request not dispatched");
            return CallResponse::Unavailable;
        }
        rx.await.unwrap_or(CallResponse::Unavailable)
    }

    /// Publish a caller-built envelope that carries its own `id`.
    ///
    /// `on_response` runs exactly once: with the verbatim response body,
    /// with [`CallResponse::Timeout`], or with
    /// [`CallResponse::Unavailable`] when the request could not be sent.
    pub async fn forward(
        &self,
        request: Value,
        on_response: impl FnOnce(CallResponse) + Send + 'static,
    ) -> RpcResult {
        let once = OnceCallback::new(on_response);

        let Some(id) = request
            .get("id")
            .and_then(normalize_id)
            .filter(|id| !id.is_empty())
        else {
            once.fire(CallResponse::Unavailable);
            return Err(RpcError::InvalidRequest("missing id".into()));
        };
        let method = request
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let bytes = match serde_json::to_vec(&request) {
            Ok(bytes) => bytes,
            Err(e) => {
                once.fire(CallResponse::Unavailable);
                return Err(RpcError::Encode(e.to_string()));
            }
        };

        let sn = match self.resolve_identity(&id, &method).await {
            Ok(sn) => sn,
            Err(e) => {
                once.fire(CallResponse::Unavailable);
                return Err(e);
            }
        };

        let on_success = once.clone();
        let on_timeout = once.clone();
        self.inner.pending.add(
            id.clone(),
            PendingCall::raw(
                move |response| {
                    on_success.fire(response);
                },
                move || {
                    on_timeout.fire(CallResponse::Timeout);
                },
            ),
            self.config.call_timeout,
        );

        let result = self.publish_request(&sn, &id, &method, bytes).await;
        if result.is_err() {
            once.fire(CallResponse::Unavailable);
        }
        result
    }

    async fn resolve_identity(&self, id: &str, method: &str) -> Result<String, RpcError> {
        self.wait_for_identity().await.ok_or_else(|| {
            warn!(call_id = %id, method = %method, "Remote identity unresolved; call dropped");
            RpcError::IdentityUnresolved
        })
    }

    /// Publish to `<sn>/request`, dropping the pending entry on failure.
    async fn publish_request(&self, sn: &str, id: &str, method: &str, bytes: Vec<u8>) -> RpcResult {
        let topic = DeviceTopics::new(sn).request();
        if let Err(e) = self.transport.publish(&topic, bytes, self.config.qos).await {
            self.inner.pending.remove(id);
            warn!(call_id = %id, method = %method, error = %e, "Publish failed");
            return Err(RpcError::from_publish(e));
        }

        debug!(call_id = %id, method = %method, topic = %topic, "Request published");
        Ok(())
    }

    // =========================================================================
    // Status feed
    // =========================================================================

    /// Subscribe to `<sn>/status` and install `on_update` as the status slot.
    ///
    /// `on_update` immediately receives [`StatusEvent::Ack`] on success or
    /// [`StatusEvent::Unavailable`] on failure (slot not installed).
    pub async fn subscribe_status(&self, on_update: StatusCallback) -> RpcResult {
        let Some(sn) = self.wait_for_identity().await else {
            on_update(StatusEvent::Unavailable);
            return Err(RpcError::IdentityUnresolved);
        };

        let topic = DeviceTopics::new(sn).status();
        if let Err(e) = self.transport.subscribe(&topic, self.config.qos).await {
            warn!(topic = %topic, error = %e, "Status subscribe failed");
            on_update(StatusEvent::Unavailable);
            return Err(e.into());
        }

        *self.inner.status.lock() = Some(on_update.clone());
        debug!(topic = %topic, "Status feed installed");
        on_update(StatusEvent::Ack);
        Ok(())
    }

    /// Clear the status slot and unsubscribe from `<sn>/status`.
    pub async fn unsubscribe_status(&self) -> RpcResult {
        *self.inner.status.lock() = None;

        let Some(sn) = self.identity() else {
            return Err(RpcError::IdentityUnresolved);
        };
        let topic = DeviceTopics::new(sn).status();
        self.transport.unsubscribe(&topic).await?;
        debug!(topic = %topic, "Status feed removed");
        Ok(())
    }

    pub fn has_status_subscription(&self) -> bool {
        self.inner.status.lock().is_some()
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Calls still awaiting a response or timeout.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn pending_stats(&self) -> &RegistryStats {
        self.inner.pending.stats()
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }
}
