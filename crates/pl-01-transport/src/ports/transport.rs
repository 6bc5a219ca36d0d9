//! The pub/sub transport port consumed by the correlator.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::{ConnectionState, QoS, TransportEvent};
use crate::error::TransportResult;

/// Receives every inbound message and lifecycle event.
///
/// Invoked on the transport's I/O task. Must not block.
pub type EventSink = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// Invoked once per connection loss that outlives the grace period.
pub type FailureCallback = Arc<dyn Fn() + Send + Sync>;

/// Publish/subscribe connection to a broker.
///
/// `subscribe`, `unsubscribe` and `publish` fail fast with
/// [`TransportError::NotConnected`](crate::TransportError::NotConnected)
/// without touching the network when no connection is established.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect. Succeeds immediately when already connected.
    async fn connect(&self) -> TransportResult;

    /// Disconnect. Succeeds when already disconnected. Local state is
    /// Disconnected afterwards even if the broker exchange failed.
    async fn disconnect(&self) -> TransportResult;

    async fn subscribe(&self, topic: &str, qos: QoS) -> TransportResult;

    async fn unsubscribe(&self, topic: &str) -> TransportResult;

    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS) -> TransportResult;

    /// Install the single event sink, replacing any previous one.
    fn set_event_sink(&self, sink: EventSink);

    /// Install the connection-failure callback.
    fn set_connection_failure_callback(&self, callback: FailureCallback);

    fn state(&self) -> ConnectionState;

    /// Receiver that observes every state transition.
    fn watch_state(&self) -> watch::Receiver<ConnectionState>;

    fn is_connected(&self) -> bool {
        self.state().is_connected()
    }
}
