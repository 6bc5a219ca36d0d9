//! # MQTT Transport
//!
//! [`Transport`] over `rumqttc`. One event-loop task per session polls the
//! broker connection, feeds inbound publishes to the event sink and
//! re-establishes the connection with bounded exponential backoff after
//! an unsolicited loss. Subscriptions are remembered and re-issued after
//! every reconnect since sessions are clean.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::{
    generate_client_id, Backoff, BrokerConfig, ConnectionState, QoS, ReconnectConfig,
    TransportConfig, TransportEvent,
};
use crate::error::{TransportError, TransportResult};
use crate::ports::{EventSink, FailureCallback, Transport};
use crate::watchdog::ConnectionWatchdog;

fn to_mqtt_qos(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

/// State shared between the transport handle and its event-loop task.
struct Shared {
    watchdog: Arc<ConnectionWatchdog>,
    sink: RwLock<Option<EventSink>>,
    subscriptions: Mutex<HashMap<String, QoS>>,
}

/// Event-loop reaction to a broker ConnAck.
#[derive(Debug, PartialEq, Eq)]
enum ConnAckOutcome {
    /// First session of a `connect` call is up.
    Established,
    /// Automatic reconnect succeeded; re-issue these subscriptions.
    Restored(Vec<(String, QoS)>),
    /// Broker refused the session.
    Rejected(String),
}

impl Shared {
    fn emit(&self, event: TransportEvent) {
        let sink = self.sink.read().clone();
        match sink {
            Some(sink) => sink(event),
            None => debug!("Transport event dropped: no sink installed"),
        }
    }

    fn remembered_subscriptions(&self) -> Vec<(String, QoS)> {
        let mut topics: Vec<(String, QoS)> = self
            .subscriptions
            .lock()
            .iter()
            .map(|(t, q)| (t.clone(), *q))
            .collect();
        topics.sort_by(|a, b| a.0.cmp(&b.0));
        topics
    }

    /// Apply a ConnAck to the connection state and announce it.
    ///
    /// `initial` marks the ConnAck answering `connect` itself.
    fn on_connack(
        &self,
        code: ConnectReturnCode,
        session_present: bool,
        initial: bool,
    ) -> ConnAckOutcome {
        if code != ConnectReturnCode::Success {
            return ConnAckOutcome::Rejected(format!("{code:?}"));
        }

        self.watchdog.connected();
        self.emit(TransportEvent::Connected);
        if initial {
            return ConnAckOutcome::Established;
        }

        info!("Reconnected to broker");
        if session_present {
            ConnAckOutcome::Restored(Vec::new())
        } else {
            ConnAckOutcome::Restored(self.remembered_subscriptions())
        }
    }

    /// Report a poll failure. Returns whether it was a loss of a live
    /// connection.
    fn on_poll_error(self: &Arc<Self>, cause: &str) -> bool {
        if !self.watchdog.state().is_connected() {
            return false;
        }
        warn!(error = %cause, "Connection lost");
        self.watchdog.lost();
        self.emit(TransportEvent::ConnectionLost {
            cause: cause.to_string(),
        });
        true
    }
}

struct Session {
    client: AsyncClient,
    task: JoinHandle<()>,
}

/// MQTT [`Transport`] adapter.
pub struct MqttTransport {
    broker: BrokerConfig,
    reconnect: ReconnectConfig,
    client_id: String,
    shared: Arc<Shared>,
    session: Mutex<Option<Session>>,
    /// Serializes connect and disconnect.
    lifecycle: tokio::sync::Mutex<()>,
}

impl MqttTransport {
    pub fn new(config: TransportConfig) -> Self {
        let client_id = generate_client_id(&config.broker.client_id_prefix);
        Self {
            shared: Arc::new(Shared {
                watchdog: ConnectionWatchdog::new(config.reconnect.grace_period),
                sink: RwLock::new(None),
                subscriptions: Mutex::new(HashMap::new()),
            }),
            broker: config.broker,
            reconnect: config.reconnect,
            client_id,
            session: Mutex::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.broker.host, self.broker.port);
        options
            .set_keep_alive(self.broker.keep_alive)
            .set_clean_session(self.broker.clean_session);
        options
    }

    /// Client of the live session, or `NotConnected`.
    fn connected_client(&self) -> TransportResult<AsyncClient> {
        if !self.shared.watchdog.state().is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.session
            .lock()
            .as_ref()
            .map(|s| s.client.clone())
            .ok_or(TransportError::NotConnected)
    }

    async fn bounded<F>(&self, op: &'static str, fut: F) -> TransportResult
    where
        F: Future<Output = Result<(), rumqttc::ClientError>>,
    {
        match tokio::time::timeout(self.broker.operation_timeout, fut).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransportError::Client(e.to_string())),
            Err(_) => Err(TransportError::Timeout(op)),
        }
    }

    fn teardown(&self) -> Option<Session> {
        self.session.lock().take()
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn connect(&self) -> TransportResult {
        let _lifecycle = self.lifecycle.lock().await;

        if self.shared.watchdog.state().is_connected() {
            return Ok(());
        }
        if let Some(stale) = self.teardown() {
            stale.task.abort();
        }

        self.shared.watchdog.connecting();
        info!(
            broker = %self.broker.address(),
            client_id = %self.client_id,
            "Connecting to broker"
        );

        let (client, eventloop) = AsyncClient::new(self.mqtt_options(), self.broker.channel_capacity);
        let (ready_tx, ready_rx) = oneshot::channel();
        let task = tokio::spawn(run_event_loop(
            eventloop,
            client.clone(),
            self.shared.clone(),
            Backoff::new(self.reconnect.initial_backoff, self.reconnect.max_backoff),
            ready_tx,
        ));

        let outcome = match tokio::time::timeout(self.broker.connect_timeout, ready_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TransportError::Client("event loop exited".into())),
            Err(_) => Err(TransportError::ConnectTimeout(self.broker.connect_timeout)),
        };

        match outcome {
            Ok(()) => {
                *self.session.lock() = Some(Session { client, task });
                info!(broker = %self.broker.address(), "Connected to broker");
                Ok(())
            }
            Err(e) => {
                task.abort();
                self.shared.watchdog.disconnected();
                error!(broker = %self.broker.address(), error = %e, "Connect failed");
                Err(e)
            }
        }
    }

    async fn disconnect(&self) -> TransportResult {
        let _lifecycle = self.lifecycle.lock().await;

        // Local state first so the event loop does not report the
        // closing connection as a loss.
        self.shared.watchdog.disconnected();
        self.shared.subscriptions.lock().clear();

        let Some(session) = self.teardown() else {
            return Ok(());
        };

        let result = self.bounded("disconnect", session.client.disconnect()).await;
        session.task.abort();

        match &result {
            Ok(()) => info!("Disconnected from broker"),
            Err(e) => warn!(error = %e, "Disconnect did not complete cleanly"),
        }
        result
    }

    async fn subscribe(&self, topic: &str, qos: QoS) -> TransportResult {
        let client = self.connected_client()?;
        self.bounded("subscribe", client.subscribe(topic, to_mqtt_qos(qos)))
            .await?;
        self.shared
            .subscriptions
            .lock()
            .insert(topic.to_string(), qos);
        debug!(topic = %topic, ?qos, "Subscribed");
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> TransportResult {
        let client = self.connected_client()?;
        self.shared.subscriptions.lock().remove(topic);
        self.bounded("unsubscribe", client.unsubscribe(topic)).await?;
        debug!(topic = %topic, "Unsubscribed");
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS) -> TransportResult {
        let client = self.connected_client()?;
        let len = payload.len();
        self.bounded(
            "publish",
            client.publish(topic, to_mqtt_qos(qos), false, payload),
        )
        .await?;
        debug!(topic = %topic, bytes = len, "Published");
        Ok(())
    }

    fn set_event_sink(&self, sink: EventSink) {
        *self.shared.sink.write() = Some(sink);
    }

    fn set_connection_failure_callback(&self, callback: FailureCallback) {
        self.shared.watchdog.set_failure_callback(callback);
    }

    fn state(&self) -> ConnectionState {
        self.shared.watchdog.state()
    }

    fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.watchdog.subscribe()
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.task.abort();
        }
    }
}

/// Re-issue remembered subscriptions on a fresh clean session.
///
/// Uses the non-blocking client calls: this runs on the event-loop task,
/// which is the one draining the request channel.
fn resubscribe(client: &AsyncClient, topics: Vec<(String, QoS)>) {
    for (topic, qos) in topics {
        if let Err(e) = client.try_subscribe(topic.as_str(), to_mqtt_qos(qos)) {
            warn!(topic = %topic, error = %e, "Resubscribe failed");
        }
    }
}

async fn run_event_loop(
    mut eventloop: EventLoop,
    client: AsyncClient,
    shared: Arc<Shared>,
    mut backoff: Backoff,
    ready: oneshot::Sender<TransportResult>,
) {
    let mut ready = Some(ready);

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                match shared.on_connack(ack.code, ack.session_present, ready.is_some()) {
                    ConnAckOutcome::Established => {
                        backoff.reset();
                        if let Some(tx) = ready.take() {
                            let _ = tx.send(Ok(()));
                        }
                    }
                    ConnAckOutcome::Restored(topics) => {
                        backoff.reset();
                        resubscribe(&client, topics);
                    }
                    ConnAckOutcome::Rejected(reason) => {
                        if let Some(tx) = ready.take() {
                            let _ = tx.send(Err(TransportError::Rejected(reason)));
                            return;
                        }
                        warn!(reason = %reason, "Broker rejected reconnect");
                        tokio::time::sleep(backoff.next_delay()).await;
                    }
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                shared.emit(TransportEvent::Message {
                    topic: publish.topic,
                    payload: publish.payload.to_vec(),
                });
            }
            Ok(_) => {}
            Err(e) => {
                if let Some(tx) = ready.take() {
                    let _ = tx.send(Err(TransportError::Client(e.to_string())));
                    return;
                }

                shared.on_poll_error(&e.to_string());

                let delay = backoff.next_delay();
                debug!(
                    attempt = backoff.attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "Retrying broker connection"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
