//! # Status Feed

use std::sync::Arc;

use parking_lot::Mutex;
use pl_01_transport::TransportError;
use pl_02_rpc::StatusEvent;
use serde_json::json;

use crate::fixtures::DeviceHarness;

fn recorder() -> (Arc<Mutex<Vec<StatusEvent>>>, pl_02_rpc::StatusCallback) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    (events, Arc::new(move |event| sink.lock().push(event)))
}

#[tokio::test(start_paused = true)]
async fn updates_flow_until_unsubscribed() {
    let device = DeviceHarness::connected("sn1").await.unwrap();
    let (events, callback) = recorder();

    device.correlator.subscribe_status(callback).await.unwrap();
    assert!(device.transport.is_subscribed_to("sn1/status"));

    assert!(device.transport.inject(
        "sn1/status",
        json!({"method": "notify_status_update", "params": {"print_stats": {"state": "printing"}}})
            .to_string()
    ));
    assert!(device.transport.inject(
        "sn1/status",
        json!({"result": {"status": {"extruder": {"temperature": 210.0}}}}).to_string()
    ));

    device.correlator.unsubscribe_status().await.unwrap();
    assert!(!device.transport.inject("sn1/status", json!({"params": {}}).to_string()));

    let events = events.lock().clone();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], StatusEvent::Ack);
    assert_eq!(
        events[1].to_json(),
        json!({"data": {"print_stats": {"state": "printing"}}, "method": "notify_status_update"})
    );
    assert_eq!(
        events[2].to_json()["data"],
        json!({"extruder": {"temperature": 210.0}})
    );
    assert!(!device.correlator.has_status_subscription());
}

#[tokio::test(start_paused = true)]
async fn failed_subscribe_reports_unavailable() {
    let device = DeviceHarness::connected("sn1").await.unwrap();
    device
        .transport
        .fail_subscribe(Some(TransportError::Timeout("subscribe")));
    let (events, callback) = recorder();

    assert!(device.correlator.subscribe_status(callback).await.is_err());

    assert_eq!(events.lock().as_slice(), &[StatusEvent::Unavailable]);
    assert!(!device.correlator.has_status_subscription());
}

#[tokio::test(start_paused = true)]
async fn status_slot_survives_reconnect() {
    let device = DeviceHarness::connected("sn1").await.unwrap();
    let (events, callback) = recorder();
    device.correlator.subscribe_status(callback).await.unwrap();

    device.correlator.disconnect().await.unwrap();
    assert!(device.correlator.has_status_subscription());
    device.correlator.connect(Some("sn1")).await.unwrap();
    assert!(device.correlator.has_status_subscription());

    // The broker session is new, so nothing reaches the slot until resubscribed.
    assert!(!device.transport.inject("sn1/status", json!({"params": {}}).to_string()));
    assert_eq!(events.lock().len(), 1);

    device.correlator.unsubscribe_status().await.unwrap();
    assert!(!device.correlator.has_status_subscription());
}
