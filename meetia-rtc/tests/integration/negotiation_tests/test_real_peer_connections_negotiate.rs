use std::sync::Arc;

use meetia_core::{MeetingId, SignalKind, TrackKind, UserId};
use meetia_rtc::{
    AnswerOutcome, LocalTrack, PeerManager, PeerPhase, RtcPeerConnector, SignalingState,
};
use tokio::sync::mpsc;

use crate::integration::{TEST_MEETING, init_tracing};

fn rtc_manager(user: &str) -> (PeerManager, mpsc::UnboundedReceiver<meetia_rtc::PeerEvent>) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let manager = PeerManager::new(
        UserId::from(user),
        MeetingId::from(TEST_MEETING),
        Vec::new(),
        Arc::new(RtcPeerConnector::default()),
        events_tx,
    );
    (manager, events_rx)
}

#[tokio::test]
async fn test_real_peer_connections_negotiate() {
    init_tracing();

    // Create two webrtc-rs backed managers without ICE servers
    let (mut alice, _alice_events) = rtc_manager("alice");
    let (mut bob, _bob_events) = rtc_manager("bob");
    alice.initialize().await.expect("Failed to create alice peer");
    bob.initialize().await.expect("Failed to create bob peer");
    assert_eq!(alice.phase(), PeerPhase::Active);

    let camera = LocalTrack::new(TrackKind::Video, "alice-camera-1");
    alice.attach(&camera).await.expect("Failed to attach track");

    let offer = alice.renegotiate(Vec::new()).await.expect("Failed to offer");
    assert_eq!(offer.kind, SignalKind::Offer);
    assert_eq!(alice.signaling_state(), Some(SignalingState::HaveLocalOffer));

    let answer = bob.handle_offer(&offer).await.expect("Failed to answer");
    assert_eq!(answer.kind, SignalKind::Answer);
    assert_eq!(answer.target, Some(UserId::from("alice")));
    assert_eq!(bob.signaling_state(), Some(SignalingState::Stable));

    let outcome = alice
        .handle_answer(&answer)
        .await
        .expect("Failed to apply answer");
    assert_eq!(outcome, AnswerOutcome::Applied);
    assert_eq!(alice.signaling_state(), Some(SignalingState::Stable));

    alice.close().await;
    bob.close().await;
    assert_eq!(alice.phase(), PeerPhase::Closed);
    assert!(!bob.has_connection());
}
