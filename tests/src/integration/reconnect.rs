//! # Reconnect Watchdog
//!
//! A lost connection gets a grace period to come back. Only when it does
//! not is the failure callback invoked, once per loss.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pl_01_transport::{ConnectionState, Transport};
use pl_02_rpc::RpcError;
use serde_json::json;

use crate::fixtures::DeviceHarness;

const GRACE: Duration = Duration::from_secs(10);

async fn watched_device() -> (DeviceHarness, Arc<AtomicUsize>) {
    let device = DeviceHarness::connected("sn1").await.unwrap();
    let failures = Arc::new(AtomicUsize::new(0));
    let counter = failures.clone();
    device
        .correlator
        .set_connection_failure_callback(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
    (device, failures)
}

#[tokio::test(start_paused = true)]
async fn reconnect_within_grace_does_not_fire() {
    let (device, failures) = watched_device().await;

    device.transport.drop_connection("keep-alive timeout");
    assert_eq!(device.transport.state(), ConnectionState::Reconnecting);

    tokio::time::sleep(GRACE / 2).await;
    device.transport.restore_connection();

    tokio::time::sleep(GRACE * 3).await;
    assert_eq!(failures.load(Ordering::SeqCst), 0);
    assert!(device.correlator.is_connected());
}

#[tokio::test(start_paused = true)]
async fn loss_beyond_grace_fires_once() {
    let (device, failures) = watched_device().await;

    device.transport.drop_connection("broker down");
    tokio::time::sleep(GRACE + Duration::from_secs(1)).await;
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert_eq!(device.transport.state(), ConnectionState::Disconnected);

    tokio::time::sleep(GRACE * 6).await;
    assert_eq!(failures.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn each_unrecovered_loss_fires() {
    let (device, failures) = watched_device().await;

    device.transport.drop_connection("first");
    tokio::time::sleep(GRACE + Duration::from_secs(1)).await;

    device.transport.restore_connection();
    device.transport.drop_connection("second");
    tokio::time::sleep(GRACE + Duration::from_secs(1)).await;

    assert_eq!(failures.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn calls_fail_fast_after_giving_up() {
    let (device, _) = watched_device().await;

    device.transport.drop_connection("broker down");
    tokio::time::sleep(GRACE + Duration::from_secs(1)).await;

    let result = device
        .correlator
        .call("printer.info", json!({}), true, |_| {}, || {}, Duration::ZERO)
        .await;

    assert_eq!(result, Err(RpcError::NotConnected));
    assert_eq!(device.correlator.pending_count(), 0);
    assert_eq!(device.transport.publish_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn pending_calls_survive_disconnect() {
    let device = DeviceHarness::connected("sn1").await.unwrap();
    let timed_out = Arc::new(AtomicUsize::new(0));
    let counter = timed_out.clone();

    device
        .correlator
        .call(
            "printer.info",
            json!({}),
            true,
            |_| {},
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            Duration::from_secs(20),
        )
        .await
        .unwrap();

    device.correlator.disconnect().await.unwrap();
    assert_eq!(device.correlator.pending_count(), 1);

    tokio::time::sleep(Duration::from_secs(22)).await;
    assert_eq!(timed_out.load(Ordering::SeqCst), 1);
    assert_eq!(device.correlator.pending_count(), 0);
}
