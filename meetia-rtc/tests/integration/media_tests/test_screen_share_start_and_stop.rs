use meetia_core::{SignalKind, StreamSource, TrackKind};
use meetia_rtc::TrackState;

use crate::integration::{create_test_session, default_devices, init_tracing, wait_state};
use crate::utils::{SIGNAL_TIMEOUT_MS, open_link, recv_signal};

#[tokio::test]
async fn test_screen_share_start_and_stop() {
    init_tracing();

    let session = create_test_session(default_devices());
    let mut wire = open_link(&session.transport_tx, 1)
        .await
        .expect("Failed to open link");
    wait_state(&session.handle, |s| s.connection_open).await;

    let screen = session
        .handle
        .start_screen_share()
        .await
        .expect("Failed to start screen share");

    let offer = recv_signal(&mut wire, SIGNAL_TIMEOUT_MS)
        .await
        .expect("Screen share should trigger an offer");
    assert_eq!(offer.kind, SignalKind::Offer);
    assert_eq!(offer.streams.len(), 1);
    assert_eq!(offer.streams[0].source, StreamSource::Screen);

    let peer = session.connector.latest();
    assert_eq!(peer.sender_count(TrackKind::Screen), 1);
    wait_state(&session.handle, |s| s.screen_sharing).await;

    assert!(session.handle.stop_screen_share().await.unwrap());
    assert_eq!(peer.sender_count(TrackKind::Screen), 0);
    let track = screen.tracks_of(TrackKind::Screen).next().expect("screen track");
    assert_eq!(track.state(), TrackState::Stopped);

    // Stopping renegotiates without the screen announcement
    let offer = recv_signal(&mut wire, SIGNAL_TIMEOUT_MS)
        .await
        .expect("Stopping should trigger an offer");
    assert_eq!(offer.kind, SignalKind::Offer);
    assert!(offer.streams.is_empty());

    wait_state(&session.handle, |s| !s.screen_sharing).await;
    assert!(!session.handle.stop_screen_share().await.unwrap());
}
