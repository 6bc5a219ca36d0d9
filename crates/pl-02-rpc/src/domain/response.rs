//! Outcomes delivered to callers.

use serde_json::{json, Value};

use super::envelope::ResponseEnvelope;

/// Terminal outcome of one call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResponse {
    /// Device returned `result`.
    Data { data: Value, method: String },
    /// Device returned `error`.
    Error { error: Value, method: String },
    /// No response within the call timeout.
    Timeout,
    /// Verbatim response body of a forwarded request.
    Raw(Value),
    /// The call could not be dispatched.
    Unavailable,
}

impl CallResponse {
    /// Map a response envelope. A body with neither field carries null data.
    pub fn from_envelope(envelope: ResponseEnvelope) -> Self {
        let method = match envelope.method {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        match (envelope.result, envelope.error) {
            (Some(data), _) => Self::Data { data, method },
            (None, Some(error)) => Self::Error { error, method },
            (None, None) => Self::Data {
                data: Value::Null,
                method,
            },
        }
    }

    /// UI payload: `{data, method}`, `{error, method}`, `{error: "timeout"}`
    /// or `null`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Data { data, method } => json!({ "data": data, "method": method }),
            Self::Error { error, method } => json!({ "error": error, "method": method }),
            Self::Timeout => json!({ "error": "timeout" }),
            Self::Raw(body) => body.clone(),
            Self::Unavailable => Value::Null,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Data { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// Event delivered to the status slot.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// Subscription established.
    Ack,
    /// Pushed device state.
    Update { data: Value, method: String },
    /// Subscription could not be established.
    Unavailable,
}

impl StatusEvent {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Ack => json!({}),
            Self::Update { data, method } => json!({ "data": data, "method": method }),
            Self::Unavailable => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(body: Value) -> ResponseEnvelope {
        ResponseEnvelope::parse(body.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_result_maps_to_data() {
        let response = CallResponse::from_envelope(envelope(
            json!({"id": "1", "result": {"state": "ready"}}),
        ));
        assert_eq!(
            response.to_json(),
            json!({"data": {"state": "ready"}, "method": ""})
        );
    }

    #[test]
    fn test_error_maps_with_method_echo() {
        let response = CallResponse::from_envelope(envelope(
            json!({"id": "1", "error": {"code": -32601}, "method": "printer.info"}),
        ));
        assert_eq!(
            response,
            CallResponse::Error {
                error: json!({"code": -32601}),
                method: "printer.info".into()
            }
        );
    }

    #[test]
    fn test_empty_response_is_null_data() {
        let response = CallResponse::from_envelope(envelope(json!({"id": "1"})));
        assert_eq!(response.data(), Some(&Value::Null));
    }

    #[test]
    fn test_timeout_and_unavailable_payloads() {
        assert_eq!(CallResponse::Timeout.to_json(), json!({"error": "timeout"}));
        assert_eq!(CallResponse::Unavailable.to_json(), Value::Null);
        assert_eq!(StatusEvent::Ack.to_json(), json!({}));
        assert_eq!(StatusEvent::Unavailable.to_json(), Value::Null);
    }
}
