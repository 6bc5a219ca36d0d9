//! [`ResponseSink`] that forwards responses into an unbounded channel.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::ports::ResponseSink;

pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Value>,
}

impl ChannelSink {
    /// Sink plus the receiver the UI side reads from.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ResponseSink for ChannelSink {
    fn deliver(&self, response: Value) {
        if self.tx.send(response).is_err() {
            debug!("Response dropped: receiver closed");
        }
    }
}
