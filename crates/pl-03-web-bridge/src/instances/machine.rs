//! Device commands served through the RPC correlator.
//!
//! - `sw_SendGCodes {codes: [..] | ".."}` runs the lines as one script
//! - `sw_GetMachineState {targets: {object: null | "field" | ["field", ..]}}`
//!   queries printer objects
//! - `sw_GetPrinterInfo` returns `printer.info`
//!
//! Each instance answers once with the call outcome and finishes, unless
//! it expired first.

use std::sync::Arc;

use pl_02_rpc::{CallResponse, DeviceApi, ObjectTarget};
use serde_json::Value;
use shared_timeout::TimeoutHook;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::domain::InstanceId;
use crate::instance::InstanceContext;
use crate::ports::{CommandInstance, InstanceFactory};

pub const SEND_GCODES: &str = "sw_SendGCodes";
pub const GET_MACHINE_STATE: &str = "sw_GetMachineState";
pub const GET_PRINTER_INFO: &str = "sw_GetPrinterInfo";

const COMMANDS: [&str; 3] = [SEND_GCODES, GET_MACHINE_STATE, GET_PRINTER_INFO];

pub struct MachineInstance {
    context: InstanceContext,
    api: DeviceApi,
}

impl MachineInstance {
    async fn run(&self) -> Result<CallResponse, String> {
        match self.context.cmd() {
            SEND_GCODES => {
                let codes = gcode_lines(self.context.params())?;
                Ok(self.api.send_gcode(&codes).await)
            }
            GET_MACHINE_STATE => {
                let targets = object_targets(self.context.params())?;
                Ok(self.api.query_objects(&targets).await)
            }
            GET_PRINTER_INFO => Ok(self.api.printer_info().await),
            other => Err(format!("unsupported command: {}", other)),
        }
    }
}

impl TimeoutHook for MachineInstance {
    fn on_timeout(&self) {
        self.context.respond_timeout();
    }
}

impl CommandInstance for MachineInstance {
    fn id(&self) -> InstanceId {
        self.context.id()
    }

    fn cmd(&self) -> &str {
        self.context.cmd()
    }

    fn process(self: Arc<Self>) {
        let Ok(runtime) = Handle::try_current() else {
            warn!(cmd = %self.context.cmd(), "No runtime to serve device command");
            self.context.respond_failed("runtime unavailable");
            self.context.finish();
            return;
        };

        runtime.spawn(async move {
            let outcome = self.run().await;
            // Already expired: the timeout response went out.
            if !self.context.finish() {
                debug!(instance = %self.context.id(), "Late device outcome dropped");
                return;
            }
            match outcome {
                Ok(response) => self.context.respond_call(response),
                Err(msg) => self.context.respond_failed(msg),
            }
        });
    }
}

/// Serves device commands over `api`.
pub struct MachineFactory {
    api: DeviceApi,
}

impl MachineFactory {
    pub fn new(api: DeviceApi) -> Self {
        Self { api }
    }
}

impl InstanceFactory for MachineFactory {
    fn create(&self, context: InstanceContext) -> Result<Arc<dyn CommandInstance>, InstanceContext> {
        if COMMANDS.contains(&context.cmd()) {
            Ok(Arc::new(MachineInstance {
                context,
                api: self.api.clone(),
            }))
        } else {
            Err(context)
        }
    }
}

/// `codes` as an array of strings or a single string.
fn gcode_lines(params: &Value) -> Result<Vec<String>, String> {
    match params.get("codes") {
        Some(Value::String(line)) => Ok(vec![line.clone()]),
        Some(Value::Array(lines)) => lines
            .iter()
            .map(|line| {
                line.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| "codes must be strings".to_string())
            })
            .collect(),
        _ => Err("missing parameter: codes".to_string()),
    }
}

/// `targets` object mapping object names to null, a field, or fields.
fn object_targets(params: &Value) -> Result<Vec<ObjectTarget>, String> {
    let targets = params
        .get("targets")
        .and_then(Value::as_object)
        .ok_or_else(|| "missing parameter: targets".to_string())?;

    targets
        .iter()
        .map(|(name, fields)| match fields {
            Value::Null => Ok(ObjectTarget::all(name.as_str())),
            Value::String(field) if field.is_empty() => Ok(ObjectTarget::all(name.as_str())),
            Value::String(field) => Ok(ObjectTarget::fields(name.as_str(), [field.as_str()])),
            Value::Array(items) => {
                let fields: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
                fields
                    .map(|f| ObjectTarget::fields(name.as_str(), f))
                    .ok_or_else(|| format!("invalid fields for {}", name))
            }
            _ => Err(format!("invalid fields for {}", name)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gcode_lines_accepts_string_or_array() {
        assert_eq!(gcode_lines(&json!({"codes": "G28"})).unwrap(), vec!["G28"]);
        assert_eq!(
            gcode_lines(&json!({"codes": ["G28", "G1 X10"]})).unwrap(),
            vec!["G28", "G1 X10"]
        );
        assert!(gcode_lines(&json!({})).is_err());
        assert!(gcode_lines(&json!({"codes": [1]})).is_err());
    }

    #[test]
    fn test_object_targets_shapes() {
        let targets = object_targets(&json!({
            "targets": {"webhooks": null, "extruder": "temperature", "print_stats": ["state", "filename"]}
        }))
        .unwrap();

        assert!(targets.contains(&ObjectTarget::all("webhooks")));
        assert!(targets.contains(&ObjectTarget::fields("extruder", ["temperature"])));
        assert!(targets.contains(&ObjectTarget::fields("print_stats", ["state", "filename"])));
        assert!(object_targets(&json!({})).is_err());
    }
}
