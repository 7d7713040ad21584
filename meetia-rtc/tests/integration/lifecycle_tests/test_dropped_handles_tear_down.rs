use meetia_rtc::MediaConstraints;

use crate::integration::{create_test_session, default_devices, init_tracing, wait_state, wait_until};
use crate::utils::open_link;

#[tokio::test]
async fn test_dropped_handles_tear_down() {
    init_tracing();

    let session = create_test_session(default_devices());
    let _wire = open_link(&session.transport_tx, 1)
        .await
        .expect("Failed to open link");
    wait_state(&session.handle, |s| s.connection_open).await;

    let stream = session
        .handle
        .start_local_stream(MediaConstraints::default())
        .await
        .expect("Failed to start local stream");
    let state = session.handle.subscribe();

    // Dropping the last handle ends the session
    drop(session.handle);

    let peer = session.connector.latest();
    wait_until("peer connection is closed", || peer.close_count() == 1).await;
    wait_until("snapshot reports closed", || state.borrow().closed).await;
    assert!(stream.tracks().iter().all(|t| !t.is_live()));
}
