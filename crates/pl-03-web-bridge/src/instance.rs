//! Per-instance state shared by every command implementation.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use pl_02_rpc::CallResponse;
use serde_json::{json, Value};
use tracing::debug;

use crate::domain::{codes, InstanceId, WebMessage, WebResponse};
use crate::ports::ResponseSink;
use crate::registry::InstanceHandle;

/// What every instance knows about the command it serves.
///
/// The first response echoes the request header. Instances with an event
/// id then switch to `{"event_id": ...}` as header for every later one.
pub struct InstanceContext {
    message: WebMessage,
    header: Mutex<Value>,
    sink: Arc<dyn ResponseSink>,
    handle: InstanceHandle,
}

impl InstanceContext {
    pub fn new(message: WebMessage, sink: Arc<dyn ResponseSink>, handle: InstanceHandle) -> Self {
        Self {
            header: Mutex::new(message.header.clone()),
            message,
            sink,
            handle,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.handle.id()
    }

    pub fn cmd(&self) -> &str {
        &self.message.cmd
    }

    pub fn params(&self) -> &Value {
        &self.message.params
    }

    pub fn event_id(&self) -> Option<&str> {
        self.message.event_id.as_deref()
    }

    /// Send a response built from `code`, `msg` and `data`.
    pub fn respond(&self, code: i64, msg: impl Into<String>, data: Value) {
        let header = {
            let mut header = self.header.lock();
            let current = header.clone();
            if let Some(event_id) = &self.message.event_id {
                *header = json!({ "event_id": event_id });
            }
            current
        };
        let response = WebResponse {
            header,
            code,
            msg: msg.into(),
            data,
        };
        debug!(instance = %self.id(), cmd = %self.cmd(), code, "Responding");
        self.sink.deliver(response.to_json());
    }

    pub fn respond_ok(&self, data: Value) {
        self.respond(codes::OK, "", data);
    }

    pub fn respond_failed(&self, msg: impl Into<String>) {
        self.respond(codes::FAILED, msg, Value::Null);
    }

    /// Translate a device call outcome.
    pub fn respond_call(&self, response: CallResponse) {
        match response {
            CallResponse::Data { data, .. } => self.respond_ok(data),
            CallResponse::Raw(body) => self.respond_ok(body),
            CallResponse::Error { error, .. } => {
                let msg = match error {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                self.respond_failed(msg);
            }
            CallResponse::Timeout => self.respond_failed("timeout"),
            CallResponse::Unavailable => self.respond_failed("device unavailable"),
        }
    }

    /// Timeout hook body shared by all instances.
    pub fn respond_timeout(&self) {
        self.respond_failed("timeout");
    }

    /// Remove the instance from the registry.
    pub fn finish(&self) -> bool {
        self.handle.finish()
    }
}

impl fmt::Debug for InstanceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceContext")
            .field("id", &self.id())
            .field("cmd", &self.message.cmd)
            .field("event_id", &self.message.event_id)
            .finish_non_exhaustive()
    }
}
