use meetia_rtc::{TransportEvent, TransportState};

use crate::integration::{create_test_session, default_devices, init_tracing, wait_state};

#[tokio::test]
async fn test_gave_up_surfaces_error() {
    init_tracing();

    let session = create_test_session(default_devices());
    session
        .transport_tx
        .send(TransportEvent::State(TransportState::Closed))
        .await
        .expect("Failed to send state");
    session
        .transport_tx
        .send(TransportEvent::GaveUp { attempts: 10 })
        .await
        .expect("Failed to send give up");

    let snapshot = wait_state(&session.handle, |s| s.last_error.is_some()).await;
    assert_eq!(
        snapshot.last_error.as_deref(),
        Some("Failed to connect to signaling server after 10 attempts")
    );
    assert!(!snapshot.loading);
    assert!(!snapshot.connection_open);
    assert_eq!(snapshot.transport_state, TransportState::Closed);
    assert_eq!(session.connector.instance_count(), 0);
}
