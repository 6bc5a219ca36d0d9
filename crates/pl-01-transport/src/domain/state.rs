//! Connection state machine and inbound events.

use std::fmt;

/// Delivery guarantee requested for a subscription or publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
    /// Used for every topic of the device conversation.
    #[default]
    ExactlyOnce,
}

/// Transport connection state.
///
/// ```text
/// Disconnected --connect()--> Connecting --ack--> Connected
/// Connected --loss--> Reconnecting --ack--> Connected
/// Reconnecting --grace expired--> Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(s)
    }
}

/// Event handed to the transport's single event sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection established or re-established.
    Connected,
    /// Unsolicited loss of the connection.
    ConnectionLost { cause: String },
    /// Inbound message.
    Message { topic: String, payload: Vec<u8> },
}
