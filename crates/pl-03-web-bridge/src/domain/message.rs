//! Messages exchanged with the web UI.
//!
//! Inbound: `{"header": {...}, "payload": {"cmd": "...", "params": ..., "event_id": "..."}}`
//! Outbound: `{"header": {...}, "payload": {"code": 0, "msg": "", "data": ...}}`

use std::fmt;

use serde_json::{json, Value};

use crate::error::BridgeError;

/// Response codes.
pub mod codes {
    pub const OK: i64 = 0;
    pub const FAILED: i64 = 1;
}

/// Handle of one live command instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A parsed inbound command.
#[derive(Debug, Clone, PartialEq)]
pub struct WebMessage {
    /// Echoed back on the first response.
    pub header: Value,
    pub cmd: String,
    pub params: Value,
    /// Present for long-lived event streams.
    pub event_id: Option<String>,
}

impl WebMessage {
    pub fn parse(text: &str) -> Result<Self, BridgeError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| BridgeError::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(mut value: Value) -> Result<Self, BridgeError> {
        let object = value
            .as_object_mut()
            .filter(|o| !o.is_empty())
            .ok_or_else(|| BridgeError::Parse("expected a non-empty object".into()))?;

        let header = object
            .remove("header")
            .ok_or(BridgeError::MissingField("header"))?;
        let mut payload = object
            .remove("payload")
            .ok_or(BridgeError::MissingField("payload"))?;

        let cmd = payload
            .get("cmd")
            .and_then(Value::as_str)
            .ok_or(BridgeError::MissingField("payload.cmd"))?
            .to_string();
        let params = payload
            .get_mut("params")
            .map(Value::take)
            .unwrap_or(Value::Null);
        let event_id = payload
            .get("event_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        Ok(Self {
            header,
            cmd,
            params,
            event_id,
        })
    }
}

/// An outbound response.
#[derive(Debug, Clone, PartialEq)]
pub struct WebResponse {
    pub header: Value,
    pub code: i64,
    pub msg: String,
    pub data: Value,
}

impl WebResponse {
    pub fn ok(header: Value, data: Value) -> Self {
        Self {
            header,
            code: codes::OK,
            msg: String::new(),
            data,
        }
    }

    pub fn failed(header: Value, msg: impl Into<String>) -> Self {
        Self {
            header,
            code: codes::FAILED,
            msg: msg.into(),
            data: Value::Null,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "header": self.header,
            "payload": {
                "code": self.code,
                "msg": self.msg,
                "data": self.data,
            }
        })
    }
}
