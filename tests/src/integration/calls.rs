//! # Call Resolution
//!
//! Every dispatched call that expects a response ends in exactly one of
//! success or timeout. Responses after the timeout are dropped.

use std::time::Duration;

use pl_02_rpc::{CallResponse, RpcError};
use serde_json::json;

use crate::fixtures::{DeviceHarness, Outcomes};

const CALL_TIMEOUT: Duration = Duration::from_secs(80);

#[tokio::test(start_paused = true)]
async fn printer_info_resolves_with_data() {
    let device = DeviceHarness::connected("sn1").await.unwrap();
    let outcomes = Outcomes::default();

    device
        .correlator
        .call(
            "printer.info",
            json!({}),
            true,
            outcomes.on_success(),
            outcomes.on_timeout(),
            Duration::ZERO,
        )
        .await
        .unwrap();

    let published = device.transport.last_published().unwrap();
    assert_eq!(published.topic, "sn1/request");
    let (id, body) = device.last_request().unwrap();
    assert_eq!(body["jsonrpc"], json!("2.0"));
    assert_eq!(body["method"], json!("printer.info"));

    assert!(device.reply("sn1", &id, json!({"result": {"state": "ready"}})));

    let responses = outcomes.responses();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].data(), Some(&json!({"state": "ready"})));
    assert_eq!(outcomes.timeouts(), 0);
    assert_eq!(device.correlator.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn silent_device_times_out_after_call_timeout() {
    let device = DeviceHarness::connected("sn1").await.unwrap();
    let outcomes = Outcomes::default();

    device
        .correlator
        .call(
            "printer.info",
            json!({}),
            true,
            outcomes.on_success(),
            outcomes.on_timeout(),
            Duration::ZERO,
        )
        .await
        .unwrap();
    assert_eq!(device.correlator.pending_count(), 1);

    tokio::time::sleep(CALL_TIMEOUT - Duration::from_secs(2)).await;
    assert_eq!(outcomes.total(), 0);

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(outcomes.timeouts(), 1);
    assert!(outcomes.responses().is_empty());
    assert_eq!(device.correlator.pending_count(), 0);
    assert_eq!(CallResponse::Timeout.to_json(), json!({"error": "timeout"}));
}

#[tokio::test(start_paused = true)]
async fn awaited_request_reports_timeout() {
    let device = DeviceHarness::connected("sn1").await.unwrap();

    let response = device
        .correlator
        .request("printer.info", json!({}), Duration::from_secs(5))
        .await;

    assert!(response.is_timeout());
    assert_eq!(device.correlator.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn late_response_is_dropped() {
    let device = DeviceHarness::connected("sn1").await.unwrap();
    let outcomes = Outcomes::default();

    device
        .correlator
        .call(
            "printer.info",
            json!({}),
            true,
            outcomes.on_success(),
            outcomes.on_timeout(),
            Duration::from_secs(3),
        )
        .await
        .unwrap();
    let (id, _) = device.last_request().unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(outcomes.timeouts(), 1);

    assert!(device.reply("sn1", &id, json!({"result": {"state": "ready"}})));
    assert_eq!(outcomes.total(), 1);
    assert!(outcomes.responses().is_empty());
}

#[tokio::test(start_paused = true)]
async fn remote_error_is_passed_through() {
    let device = DeviceHarness::connected("sn1").await.unwrap();
    let outcomes = Outcomes::default();

    device
        .correlator
        .call(
            "printer.print.start",
            json!({"filename": "missing.gcode"}),
            true,
            outcomes.on_success(),
            outcomes.on_timeout(),
            Duration::ZERO,
        )
        .await
        .unwrap();
    let (id, _) = device.last_request().unwrap();
    device.reply(
        "sn1",
        &id,
        json!({"error": {"code": 400, "message": "file not found"}, "method": "printer.print.start"}),
    );

    let responses = outcomes.responses();
    assert_eq!(
        responses,
        vec![CallResponse::Error {
            error: json!({"code": 400, "message": "file not found"}),
            method: "printer.print.start".into(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn every_call_resolves_exactly_once() {
    const CALLS: usize = 40;
    let device = DeviceHarness::connected("sn1").await.unwrap();
    let outcomes: Vec<Outcomes> = (0..CALLS).map(|_| Outcomes::default()).collect();
    let mut ids = Vec::new();

    for outcome in &outcomes {
        device
            .correlator
            .call(
                "printer.objects.list",
                json!({}),
                true,
                outcome.on_success(),
                outcome.on_timeout(),
                Duration::from_secs(10),
            )
            .await
            .unwrap();
        ids.push(device.last_request().unwrap().0);
    }

    // Answer the even calls, some twice.
    for (i, id) in ids.iter().enumerate().filter(|(i, _)| i % 2 == 0) {
        device.reply("sn1", id, json!({"result": {"n": i}}));
        if i % 4 == 0 {
            device.reply("sn1", id, json!({"result": {"n": i}}));
        }
    }

    tokio::time::sleep(Duration::from_secs(12)).await;

    for (i, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.total(), 1, "call {} resolved {} times", i, outcome.total());
        if i % 2 == 0 {
            assert_eq!(outcome.responses()[0].data(), Some(&json!({"n": i})));
        } else {
            assert_eq!(outcome.timeouts(), 1);
        }
    }
    assert_eq!(device.correlator.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn fire_and_forget_registers_nothing() {
    let device = DeviceHarness::connected("sn1").await.unwrap();

    device
        .correlator
        .call(
            "printer.print.pause",
            json!({}),
            false,
            |_| {},
            || {},
            Duration::ZERO,
        )
        .await
        .unwrap();

    let published = device.transport.last_published().unwrap();
    let body: serde_json::Value = serde_json::from_slice(&published.payload).unwrap();
    assert!(body.get("id").is_none());
    assert_eq!(device.correlator.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn publish_failure_unregisters_call() {
    let device = DeviceHarness::connected("sn1").await.unwrap();
    device
        .transport
        .fail_publish(Some(pl_01_transport::TransportError::Client("broker gone".into())));
    let outcomes = Outcomes::default();

    let result = device
        .correlator
        .call(
            "printer.info",
            json!({}),
            true,
            outcomes.on_success(),
            outcomes.on_timeout(),
            Duration::ZERO,
        )
        .await;

    assert!(matches!(result, Err(RpcError::Publish(_))));
    assert_eq!(device.correlator.pending_count(), 0);

    tokio::time::sleep(CALL_TIMEOUT * 2).await;
    assert_eq!(outcomes.total(), 0);
}
