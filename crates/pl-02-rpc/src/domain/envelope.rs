//! JSON-RPC shaped envelopes exchanged with the device.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outbound request published to `<sn>/request`.
///
/// `id` is omitted for fire-and-forget calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl RequestEnvelope {
    pub fn new(method: impl Into<String>, params: Value, id: Option<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
            id,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Inbound response from `<sn>/response`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub id: String,
    pub result: Option<Value>,
    pub error: Option<Value>,
    pub method: Option<Value>,
    /// Whole message as received.
    pub body: Value,
}

impl ResponseEnvelope {
    /// Parse a response payload. `None` for non-JSON or id-less messages.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let body: Value = serde_json::from_slice(payload).ok()?;
        let object = body.as_object()?;
        let id = normalize_id(object.get("id")?)?;
        Some(Self {
            id,
            result: object.get("result").cloned(),
            error: object.get("error").cloned(),
            method: object.get("method").cloned(),
            body,
        })
    }
}

/// Inbound status push from `<sn>/status`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEnvelope {
    pub data: Value,
    pub method: Option<Value>,
}

impl StatusEnvelope {
    /// `params` is preferred, `result.status` is the fallback.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let body: Value = serde_json::from_slice(payload).ok()?;
        let object = body.as_object()?;
        let data = match object.get("params") {
            Some(params) => params.clone(),
            None => object.get("result")?.get("status")?.clone(),
        };
        Some(Self {
            data,
            method: object.get("method").cloned(),
        })
    }
}

/// String ids pass through; numeric ids are rendered in decimal.
pub fn normalize_id(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let envelope = RequestEnvelope::new("printer.info", json!({}), Some("abc".into()));
        let value: Value = serde_json::from_slice(&envelope.to_bytes().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"jsonrpc": "2.0", "method": "printer.info", "params": {}, "id": "abc"})
        );
    }

    #[test]
    fn test_request_without_id_omits_field() {
        let envelope = RequestEnvelope::new("printer.print.pause", json!({}), None);
        let value: Value = serde_json::from_slice(&envelope.to_bytes().unwrap()).unwrap();
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_response_numeric_id() {
        let response = ResponseEnvelope::parse(br#"{"id": 42, "result": {"ok": true}}"#).unwrap();
        assert_eq!(response.id, "42");
        assert_eq!(response.result, Some(json!({"ok": true})));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_response_rejects_missing_id_and_garbage() {
        assert!(ResponseEnvelope::parse(br#"{"result": {}}"#).is_none());
        assert!(ResponseEnvelope::parse(br#"{"id": null, "result": {}}"#).is_none());
        assert!(ResponseEnvelope::parse(b"not json").is_none());
    }

    #[test]
    fn test_status_prefers_params() {
        let status = StatusEnvelope::parse(
            br#"{"method": "notify_status_update", "params": {"a": 1}, "result": {"status": {"b": 2}}}"#,
        )
        .unwrap();
        assert_eq!(status.data, json!({"a": 1}));
        assert_eq!(status.method, Some(json!("notify_status_update")));
    }

    #[test]
    fn test_status_falls_back_to_result_status() {
        let status = StatusEnvelope::parse(br#"{"result": {"status": {"b": 2}}}"#).unwrap();
        assert_eq!(status.data, json!({"b": 2}));
        assert!(StatusEnvelope::parse(br#"{"result": {}}"#).is_none());
    }
}
