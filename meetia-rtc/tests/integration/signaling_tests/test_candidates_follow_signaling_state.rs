use meetia_core::SignalKind;
use meetia_rtc::SignalingState;

use crate::integration::{create_test_session, default_devices, init_tracing, wait_state};
use crate::utils::{SIGNAL_TIMEOUT_MS, expect_no_signal, open_link, recv_signal};

#[tokio::test]
async fn test_candidates_follow_signaling_state() {
    init_tracing();

    let session = create_test_session(default_devices());
    let mut wire = open_link(&session.transport_tx, 1)
        .await
        .expect("Failed to open link");
    wait_state(&session.handle, |s| s.connection_open).await;

    let peer = session.connector.latest();
    peer.emit_candidate("candidate:1 1 udp 2122260223 10.0.0.2 50000 typ host");

    let sent = recv_signal(&mut wire, SIGNAL_TIMEOUT_MS)
        .await
        .expect("Candidate should be sent in stable state");
    assert_eq!(sent.kind, SignalKind::Candidate);
    assert_eq!(sent.target, None);

    // Mid negotiation of a remote offer, local candidates are held back
    peer.force_signaling_state(SignalingState::HaveRemoteOffer);
    peer.emit_candidate("candidate:3 1 udp 2122260223 10.0.0.2 50001 typ host");
    expect_no_signal(&mut wire)
        .await
        .expect("Candidate must be dropped in have-remote-offer");

    assert_eq!(session.handle.snapshot().pending_signals, 0);
}
