use meetia_rtc::{ConnectionState, PeerPhase};

use crate::integration::{create_test_session, default_devices, init_tracing, wait_state};
use crate::utils::{expect_no_signal, open_link};

#[tokio::test]
async fn test_connection_failure_requires_rejoin() {
    init_tracing();

    let session = create_test_session(default_devices());
    let mut wire = open_link(&session.transport_tx, 1)
        .await
        .expect("Failed to open link");
    wait_state(&session.handle, |s| s.connection_open).await;

    session
        .connector
        .latest()
        .set_connection_state(ConnectionState::Failed);

    let snapshot = wait_state(&session.handle, |s| s.last_error.is_some()).await;
    assert_eq!(snapshot.last_error.as_deref(), Some("Peer connection failed"));
    assert_eq!(snapshot.peer_phase, PeerPhase::Failed);
    assert!(!snapshot.loading);

    // No automatic recovery
    expect_no_signal(&mut wire).await.expect("Nothing should be sent");
    assert_eq!(session.connector.instance_count(), 1);

    session.handle.rejoin().await.expect("Rejoin should succeed");
    assert_eq!(session.connector.instance_count(), 2);
    assert_eq!(session.connector.instance(0).close_count(), 1);

    let snapshot = wait_state(&session.handle, |s| s.peer_phase == PeerPhase::Active).await;
    assert_eq!(snapshot.last_error, None);
    assert!(snapshot.loading);
}
