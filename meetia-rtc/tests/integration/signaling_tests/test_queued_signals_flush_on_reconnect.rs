use meetia_core::SignalKind;
use meetia_rtc::TransportEvent;

use crate::integration::{create_test_session, default_devices, init_tracing, wait_state};
use crate::utils::{SIGNAL_TIMEOUT_MS, expect_no_signal, open_link, recv_signal};

#[tokio::test]
async fn test_queued_signals_flush_on_reconnect() {
    init_tracing();

    let session = create_test_session(default_devices());
    let _first = open_link(&session.transport_tx, 1)
        .await
        .expect("Failed to open link");
    wait_state(&session.handle, |s| s.connection_open).await;

    // Lose the relay connection
    session
        .transport_tx
        .send(TransportEvent::Closed { clean: false })
        .await
        .expect("Failed to close link");
    wait_state(&session.handle, |s| !s.connection_open).await;

    // Candidates gathered while offline wait in the queue
    let peer = session.connector.latest();
    let gathered = [
        "candidate:1 1 udp 2122260223 10.0.0.2 50000 typ host",
        "candidate:2 1 udp 1686052607 203.0.113.5 40000 typ srflx",
        "candidate:3 1 tcp 1518280447 10.0.0.2 9 typ host tcptype active",
    ];
    for candidate in gathered {
        peer.emit_candidate(candidate);
    }
    let snapshot = wait_state(&session.handle, |s| s.pending_signals == 3).await;
    assert!(!snapshot.connection_open);

    // The new connection gets them, in order, before anything else
    let mut wire = open_link(&session.transport_tx, 2)
        .await
        .expect("Failed to reopen link");
    for expected in gathered {
        let flushed = recv_signal(&mut wire, SIGNAL_TIMEOUT_MS)
            .await
            .expect("Queued candidate should be flushed");
        assert_eq!(flushed.kind, SignalKind::Candidate);
        assert_eq!(flushed.user_id.as_str(), "alice");
        assert_eq!(flushed.candidate.expect("candidate payload").candidate, expected);
    }

    // No local tracks, so the fresh peer connection sends nothing
    expect_no_signal(&mut wire).await.expect("Nothing else should be sent");
    let snapshot = wait_state(&session.handle, |s| s.connection_open).await;
    assert_eq!(snapshot.pending_signals, 0);
    assert_eq!(session.connector.instance_count(), 2);
}
