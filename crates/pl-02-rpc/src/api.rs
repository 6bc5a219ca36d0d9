//! Typed device calls.
//!
//! Each method is a call that expects a response; it resolves to
//! [`CallResponse::Timeout`] after the call timeout and to
//! [`CallResponse::Unavailable`] when the call could not be dispatched.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};

use crate::domain::{CallResponse, OnceCallback};
use crate::error::RpcResult;
use crate::service::RpcCorrelator;

pub mod methods {
    pub const PRINTER_INFO: &str = "printer.info";
    pub const PRINT_START: &str = "printer.print.start";
    pub const PRINT_PAUSE: &str = "printer.print.pause";
    pub const PRINT_RESUME: &str = "printer.print.resume";
    pub const PRINT_CANCEL: &str = "printer.print.cancel";
    pub const GCODE_SCRIPT: &str = "printer.gcode.script";
    pub const OBJECTS_QUERY: &str = "printer.objects.query";
    pub const OBJECTS_SUBSCRIBE: &str = "printer.objects.subscribe";
    pub const OBJECTS_LIST: &str = "printer.objects.list";
    pub const FILES_ROOTS: &str = "server.files.roots";
    pub const FILES_METADATA: &str = "server.files.metadata";
    pub const FILES_THUMBNAILS: &str = "server.files.thumbnails";
    pub const FILES_DIRECTORY: &str = "server.files.get_directory";
    pub const CAMERA_START: &str = "server.camera.start_monitor";
    pub const CAMERA_STOP: &str = "server.camera.stop_monitor";
    pub const SYSTEM_INFO: &str = "machine.system_info";
}

/// A printer object and the fields to read. No fields means all fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTarget {
    pub name: String,
    pub fields: Vec<String>,
}

impl ObjectTarget {
    pub fn all(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn fields<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// `{"objects": {name: [fields] | null}}`
pub fn objects_params(targets: &[ObjectTarget]) -> Value {
    let objects: Map<String, Value> = targets
        .iter()
        .map(|t| {
            let fields = if t.fields.is_empty() {
                Value::Null
            } else {
                json!(t.fields)
            };
            (t.name.clone(), fields)
        })
        .collect();
    json!({ "objects": objects })
}

/// Device calls over one correlator.
#[derive(Clone)]
pub struct DeviceApi {
    rpc: Arc<RpcCorrelator>,
}

impl DeviceApi {
    pub fn new(rpc: Arc<RpcCorrelator>) -> Self {
        Self { rpc }
    }

    pub fn correlator(&self) -> &Arc<RpcCorrelator> {
        &self.rpc
    }

    /// Call `method` and deliver the single outcome to `callback`.
    pub async fn send(
        &self,
        method: &str,
        params: Value,
        callback: impl FnOnce(CallResponse) + Send + 'static,
    ) -> RpcResult {
        let once = OnceCallback::new(callback);
        let on_success = once.clone();
        let on_timeout = once.clone();

        let result = self
            .rpc
            .call(
                method,
                params,
                true,
                move |response| {
                    on_success.fire(response);
                },
                move || {
                    on_timeout.fire(CallResponse::Timeout);
                },
                Duration::ZERO,
            )
            .await;

        if result.is_err() {
            once.fire(CallResponse::Unavailable);
        }
        result
    }

    async fn ask(&self, method: &str, params: Value) -> CallResponse {
        self.rpc.request(method, params, Duration::ZERO).await
    }

    pub async fn printer_info(&self) -> CallResponse {
        self.ask(methods::PRINTER_INFO, json!({})).await
    }

    pub async fn start_print(&self, filename: &str) -> CallResponse {
        self.ask(methods::PRINT_START, json!({ "filename": filename }))
            .await
    }

    pub async fn pause_print(&self) -> CallResponse {
        self.ask(methods::PRINT_PAUSE, json!({})).await
    }

    pub async fn resume_print(&self) -> CallResponse {
        self.ask(methods::PRINT_RESUME, json!({})).await
    }

    pub async fn cancel_print(&self) -> CallResponse {
        self.ask(methods::PRINT_CANCEL, json!({})).await
    }

    /// Run G-code lines as one script.
    pub async fn send_gcode<S: AsRef<str>>(&self, lines: &[S]) -> CallResponse {
        let script = lines
            .iter()
            .map(|line| line.as_ref())
            .collect::<Vec<&str>>()
            .join("\n");
        self.ask(methods::GCODE_SCRIPT, json!({ "script": script }))
            .await
    }

    pub async fn query_objects(&self, targets: &[ObjectTarget]) -> CallResponse {
        self.ask(methods::OBJECTS_QUERY, objects_params(targets))
            .await
    }

    /// Select which objects the status feed reports.
    pub async fn subscribe_objects(&self, targets: &[ObjectTarget]) -> CallResponse {
        self.ask(methods::OBJECTS_SUBSCRIBE, objects_params(targets))
            .await
    }

    pub async fn list_objects(&self) -> CallResponse {
        self.ask(methods::OBJECTS_LIST, json!({})).await
    }

    pub async fn file_roots(&self) -> CallResponse {
        self.ask(methods::FILES_ROOTS, json!({})).await
    }

    pub async fn file_metadata(&self, filename: &str) -> CallResponse {
        self.ask(methods::FILES_METADATA, json!({ "filename": filename }))
            .await
    }

    pub async fn file_thumbnails(&self, filename: &str) -> CallResponse {
        self.ask(methods::FILES_THUMBNAILS, json!({ "filename": filename }))
            .await
    }

    pub async fn directory(&self, path: &str, extended: bool) -> CallResponse {
        self.ask(
            methods::FILES_DIRECTORY,
            json!({ "path": path, "extended": extended }),
        )
        .await
    }

    pub async fn start_camera(&self, domain: &str) -> CallResponse {
        self.ask(methods::CAMERA_START, json!({ "domain": domain }))
            .await
    }

    pub async fn stop_camera(&self, domain: &str) -> CallResponse {
        self.ask(methods::CAMERA_STOP, json!({ "domain": domain }))
            .await
    }

    pub async fn system_info(&self) -> CallResponse {
        self.ask(methods::SYSTEM_INFO, json!({})).await
    }
}
