//! # Identity Discovery and Gating
//!
//! Without a serial number hint the correlator listens on wildcard topics
//! until a device announces itself. Calls made before that wait a bounded
//! time and fail without publishing.

use std::time::Duration;

use pl_02_rpc::RpcError;
use serde_json::json;

use crate::fixtures::{DeviceHarness, Outcomes};

const IDENTITY_WAIT: Duration = Duration::from_secs(6);

#[tokio::test(start_paused = true)]
async fn call_without_identity_fails_without_publishing() {
    let device = DeviceHarness::new();
    device.correlator.connect(None).await.unwrap();
    let outcomes = Outcomes::default();

    let started = tokio::time::Instant::now();
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

    assert_eq!(result, Err(RpcError::IdentityUnresolved));
    assert!(started.elapsed() >= IDENTITY_WAIT);
    assert_eq!(device.transport.publish_count(), 0);
    assert_eq!(device.correlator.pending_count(), 0);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(outcomes.total(), 0);
}

#[tokio::test(start_paused = true)]
async fn wildcard_subscriptions_until_discovery() {
    let device = DeviceHarness::new();
    device.correlator.connect(None).await.unwrap();

    assert_eq!(
        device.transport.subscriptions(),
        vec!["+/notification".to_string(), "+/response".to_string()]
    );
    assert!(device.correlator.identity().is_none());

    assert!(device.announce("SN7"));
    assert_eq!(device.correlator.identity().as_deref(), Some("SN7"));
}

#[tokio::test(start_paused = true)]
async fn pending_call_proceeds_once_device_announces() {
    let device = DeviceHarness::new();
    device.correlator.connect(None).await.unwrap();
    device.auto_reply("SN7", |_| json!({"state": "ready"}));

    let correlator = device.correlator.clone();
    let call = tokio::spawn(async move {
        correlator
            .request("printer.info", json!({}), Duration::ZERO)
            .await
    });

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(device.transport.publish_count(), 0);
    device.announce("SN7");

    let response = call.await.unwrap();
    assert_eq!(response.data(), Some(&json!({"state": "ready"})));
    assert_eq!(device.transport.last_published().unwrap().topic, "SN7/request");
}

#[tokio::test(start_paused = true)]
async fn hint_skips_discovery() {
    let device = DeviceHarness::connected("SN1").await.unwrap();

    assert_eq!(device.correlator.identity().as_deref(), Some("SN1"));
    assert!(device.transport.is_subscribed_to("SN1/notification"));
    assert!(device.transport.is_subscribed_to("SN1/response"));
    assert!(!device.transport.is_subscribed_to("+/response"));
}

#[tokio::test(start_paused = true)]
async fn reconnect_resets_identity() {
    let device = DeviceHarness::connected("SN1").await.unwrap();

    device.correlator.connect(Some("SN2")).await.unwrap();
    assert_eq!(device.correlator.identity().as_deref(), Some("SN2"));

    device.correlator.connect(None).await.unwrap();
    assert!(device.correlator.identity().is_none());
}

#[tokio::test(start_paused = true)]
async fn reannouncement_replaces_identity() {
    let device = DeviceHarness::new();
    device.correlator.connect(None).await.unwrap();

    device.announce("SN1");
    device.announce("SN2");

    assert_eq!(device.correlator.identity().as_deref(), Some("SN2"));
}
