//! In-memory broker for deterministic tests.
//!
//! Records every publish, tracks subscriptions with MQTT wildcard
//! matching, and lets tests inject inbound messages and connection loss.
//! An optional responder can answer publishes synchronously, the way a
//! device on the other side of the broker would.
//!
//! Requires feature: `test-utils`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{watch, Notify};

use crate::domain::{topic_matches, ConnectionState, QoS, ReconnectConfig, TransportEvent};
use crate::error::{TransportError, TransportResult};
use crate::ports::{EventSink, FailureCallback, Transport};
use crate::watchdog::ConnectionWatchdog;

/// A message published through the memory transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
}

impl PublishedMessage {
    /// Payload as UTF-8 text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Answers a publish with zero or more `(topic, payload)` inbound messages.
pub type Responder = Arc<dyn Fn(&PublishedMessage) -> Vec<(String, Vec<u8>)> + Send + Sync>;

#[derive(Default)]
struct Faults {
    connect: Option<TransportError>,
    subscribe: Option<TransportError>,
    unsubscribe: Option<TransportError>,
    publish: Option<TransportError>,
}

/// Scriptable in-memory [`Transport`].
pub struct MemoryTransport {
    watchdog: Arc<ConnectionWatchdog>,
    sink: RwLock<Option<EventSink>>,
    subscriptions: Mutex<HashMap<String, QoS>>,
    published: Mutex<Vec<PublishedMessage>>,
    publish_notify: Notify,
    responder: RwLock<Option<Responder>>,
    faults: Mutex<Faults>,
    connect_calls: Mutex<u32>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::with_grace(ReconnectConfig::default().grace_period)
    }

    /// Memory transport whose watchdog uses `grace`.
    pub fn with_grace(grace: Duration) -> Self {
        Self {
            watchdog: ConnectionWatchdog::new(grace),
            sink: RwLock::new(None),
            subscriptions: Mutex::new(HashMap::new()),
            published: Mutex::new(Vec::new()),
            publish_notify: Notify::new(),
            responder: RwLock::new(None),
            faults: Mutex::new(Faults::default()),
            connect_calls: Mutex::new(0),
        }
    }

    // =========================================================================
    // Scripting
    // =========================================================================

    pub fn set_responder(&self, responder: Responder) {
        *self.responder.write() = Some(responder);
    }

    pub fn clear_responder(&self) {
        *self.responder.write() = None;
    }

    pub fn fail_connect(&self, error: Option<TransportError>) {
        self.faults.lock().connect = error;
    }

    pub fn fail_subscribe(&self, error: Option<TransportError>) {
        self.faults.lock().subscribe = error;
    }

    pub fn fail_unsubscribe(&self, error: Option<TransportError>) {
        self.faults.lock().unsubscribe = error;
    }

    pub fn fail_publish(&self, error: Option<TransportError>) {
        self.faults.lock().publish = error;
    }

    /// Deliver an inbound message if any subscription matches `topic`.
    ///
    /// Returns whether it was delivered.
    pub fn inject(&self, topic: &str, payload: impl Into<Vec<u8>>) -> bool {
        if !self.watchdog.state().is_connected() || !self.is_subscribed_to(topic) {
            return false;
        }
        self.emit(TransportEvent::Message {
            topic: topic.to_string(),
            payload: payload.into(),
        });
        true
    }

    /// Simulate an unsolicited connection loss.
    pub fn drop_connection(&self, cause: &str) {
        self.watchdog.lost();
        self.emit(TransportEvent::ConnectionLost {
            cause: cause.to_string(),
        });
    }

    /// Simulate a successful automatic reconnect.
    pub fn restore_connection(&self) {
        self.watchdog.connected();
        self.emit(TransportEvent::Connected);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().clone()
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().len()
    }

    pub fn last_published(&self) -> Option<PublishedMessage> {
        self.published.lock().last().cloned()
    }

    /// Wait until at least `count` messages were published.
    ///
    /// Returns false if `timeout` elapsed first.
    pub async fn wait_for_publishes(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.publish_notify.notified();
                if self.publish_count() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.subscriptions.lock().keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn is_subscribed_to(&self, topic: &str) -> bool {
        self.subscriptions
            .lock()
            .keys()
            .any(|filter| topic_matches(filter, topic))
    }

    pub fn connect_calls(&self) -> u32 {
        *self.connect_calls.lock()
    }

    fn emit(&self, event: TransportEvent) {
        let sink = self.sink.read().clone();
        if let Some(sink) = sink {
            sink(event);
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self) -> TransportResult {
        *self.connect_calls.lock() += 1;
        if self.watchdog.state().is_connected() {
            return Ok(());
        }
        self.watchdog.connecting();
        let fault = self.faults.lock().connect.clone();
        if let Some(e) = fault {
            self.watchdog.disconnected();
            return Err(e);
        }
        self.watchdog.connected();
        self.emit(TransportEvent::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult {
        self.watchdog.disconnected();
        self.subscriptions.lock().clear();
        Ok(())
    }

    async fn subscribe(&self, topic: &str, qos: QoS) -> TransportResult {
        if !self.watchdog.state().is_connected() {
            return Err(TransportError::NotConnected);
        }
        if let Some(e) = self.faults.lock().subscribe.clone() {
            return Err(e);
        }
        self.subscriptions.lock().insert(topic.to_string(), qos);
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> TransportResult {
        if !self.watchdog.state().is_connected() {
            return Err(TransportError::NotConnected);
        }
        if let Some(e) = self.faults.lock().unsubscribe.clone() {
            return Err(e);
        }
        self.subscriptions.lock().remove(topic);
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS) -> TransportResult {
        if !self.watchdog.state().is_connected() {
            return Err(TransportError::NotConnected);
        }
        if let Some(e) = self.faults.lock().publish.clone() {
            return Err(e);
        }

        let message = PublishedMessage {
            topic: topic.to_string(),
            payload,
            qos,
        };
        self.published.lock().push(message.clone());
        self.publish_notify.notify_waiters();

        let responder = self.responder.read().clone();
        if let Some(responder) = responder {
            for (topic, payload) in responder(&message) {
                self.inject(&topic, payload);
            }
        }
        Ok(())
    }

    fn set_event_sink(&self, sink: EventSink) {
        *self.sink.write() = Some(sink);
    }

    fn set_connection_failure_callback(&self, callback: FailureCallback) {
        self.watchdog.set_failure_callback(callback);
    }

    fn state(&self) -> ConnectionState {
        self.watchdog.state()
    }

    fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.watchdog.subscribe()
    }
}
