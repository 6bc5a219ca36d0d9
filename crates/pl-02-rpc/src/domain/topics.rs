//! Topic layout of a device conversation.
//!
//! Every topic is `<sn>/<kind>`. Until the serial number is known the
//! correlator listens on `+/<kind>`.

/// Single-level wildcard used before the identity is known.
pub const WILDCARD: &str = "+";

const REQUEST: &str = "/request";
const RESPONSE: &str = "/response";
const STATUS: &str = "/status";
const NOTIFICATION: &str = "/notification";

/// Topics for one device prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTopics {
    prefix: String,
}

impl DeviceTopics {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Topics for any device.
    pub fn wildcard() -> Self {
        Self::new(WILDCARD)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn request(&self) -> String {
        format!("{}{}", self.prefix, REQUEST)
    }

    pub fn response(&self) -> String {
        format!("{}{}", self.prefix, RESPONSE)
    }

    pub fn status(&self) -> String {
        format!("{}{}", self.prefix, STATUS)
    }

    pub fn notification(&self) -> String {
        format!("{}{}", self.prefix, NOTIFICATION)
    }
}

/// Classification of an inbound topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind<'a> {
    Response,
    Status,
    /// Carries the identity: the topic text before `/notification`.
    Notification { identity: &'a str },
    Other,
}

impl<'a> InboundKind<'a> {
    pub fn classify(topic: &'a str) -> Self {
        if topic.ends_with(RESPONSE) {
            Self::Response
        } else if topic.ends_with(STATUS) {
            Self::Status
        } else if let Some(identity) = topic.strip_suffix(NOTIFICATION) {
            Self::Notification { identity }
        } else {
            Self::Other
        }
    }
}

/// A usable identity: non-empty and not the wildcard.
pub fn is_resolved(identity: &str) -> bool {
    !identity.is_empty() && identity != WILDCARD
}
