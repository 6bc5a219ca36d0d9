//! # Web Commands Against a Device
//!
//! Device commands from the web UI travel through the correlator and come
//! back as one `{code, msg, data}` response per instance.

use std::sync::Arc;
use std::time::Duration;

use pl_02_rpc::DeviceApi;
use pl_03_web_bridge::{BridgeConfig, ChannelSink, EchoFactory, MachineFactory, WebBridge};
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::fixtures::DeviceHarness;

fn bridge_for(device: &DeviceHarness) -> (WebBridge, UnboundedReceiver<Value>) {
    let (sink, rx) = ChannelSink::new();
    let bridge = WebBridge::new(&BridgeConfig::default(), Arc::new(sink))
        .with_factory(EchoFactory)
        .with_factory(MachineFactory::new(DeviceApi::new(device.correlator.clone())));
    (bridge, rx)
}

fn command(cmd: &str, params: Value) -> String {
    json!({"header": {"seq": 1}, "payload": {"cmd": cmd, "params": params}}).to_string()
}

#[tokio::test(start_paused = true)]
async fn gcode_lines_become_one_script() {
    let device = DeviceHarness::connected("sn1").await.unwrap();
    device.auto_reply("sn1", |_| json!("ok"));
    let (bridge, mut rx) = bridge_for(&device);

    bridge
        .handle_message(&command("sw_SendGCodes", json!({"codes": ["G28", "G1 X10 F3000"]})))
        .unwrap();

    let response = rx.recv().await.unwrap();
    assert_eq!(
        response,
        json!({"header": {"seq": 1}, "payload": {"code": 0, "msg": "", "data": "ok"}})
    );

    let (_, request) = device.last_request().unwrap();
    assert_eq!(request["method"], json!("printer.gcode.script"));
    assert_eq!(request["params"], json!({"script": "G28\nG1 X10 F3000"}));
    assert!(bridge.is_empty());
}

#[tokio::test(start_paused = true)]
async fn machine_state_queries_objects() {
    let device = DeviceHarness::connected("sn1").await.unwrap();
    device.auto_reply("sn1", |body| json!({"status": body["params"]["objects"]}));
    let (bridge, mut rx) = bridge_for(&device);

    bridge
        .handle_message(&command(
            "sw_GetMachineState",
            json!({"targets": {"print_stats": ["state"], "webhooks": null}}),
        ))
        .unwrap();

    let response = rx.recv().await.unwrap();
    assert_eq!(response["payload"]["code"], json!(0));
    assert_eq!(
        response["payload"]["data"],
        json!({"status": {"print_stats": ["state"], "webhooks": null}})
    );
}

#[tokio::test(start_paused = true)]
async fn device_error_fails_the_command() {
    let device = DeviceHarness::connected("sn1").await.unwrap();
    device.transport.set_responder(Arc::new(|message: &pl_01_transport::PublishedMessage| {
        let body: Value = serde_json::from_slice(&message.payload).unwrap_or_default();
        let reply = json!({"id": body["id"], "error": "Printer is not ready"});
        vec![("sn1/response".to_string(), reply.to_string().into_bytes())]
    }));
    let (bridge, mut rx) = bridge_for(&device);

    bridge
        .handle_message(&command("sw_SendGCodes", json!({"codes": "G28"})))
        .unwrap();

    let response = rx.recv().await.unwrap();
    assert_eq!(response["payload"]["code"], json!(1));
    assert_eq!(response["payload"]["msg"], json!("Printer is not ready"));
}

#[tokio::test(start_paused = true)]
async fn missing_parameter_fails_without_publishing() {
    let device = DeviceHarness::connected("sn1").await.unwrap();
    let (bridge, mut rx) = bridge_for(&device);

    bridge
        .handle_message(&command("sw_GetMachineState", json!({})))
        .unwrap();

    let response = rx.recv().await.unwrap();
    assert_eq!(response["payload"]["msg"], json!("missing parameter: targets"));
    assert_eq!(device.transport.publish_count(), 0);
    assert!(bridge.is_empty());
}

#[tokio::test(start_paused = true)]
async fn silent_device_answers_once_with_timeout() {
    let device = DeviceHarness::connected("sn1").await.unwrap();
    let (bridge, mut rx) = bridge_for(&device);

    bridge
        .handle_message(&command("sw_GetPrinterInfo", json!({})))
        .unwrap();

    // Instance lifetime (30s) ends before the call timeout (80s).
    tokio::time::sleep(Duration::from_secs(32)).await;
    let response = rx.recv().await.unwrap();
    assert_eq!(response["payload"]["msg"], json!("timeout"));
    assert!(bridge.is_empty());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(device.correlator.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn unreachable_device_reports_unavailable() {
    let device = DeviceHarness::connected("sn1").await.unwrap();
    device.correlator.disconnect().await.unwrap();
    let (bridge, mut rx) = bridge_for(&device);

    bridge
        .handle_message(&command("sw_GetPrinterInfo", json!({})))
        .unwrap();

    let response = rx.recv().await.unwrap();
    assert_eq!(response["payload"]["code"], json!(1));
    assert_eq!(response["payload"]["msg"], json!("device unavailable"));
}
