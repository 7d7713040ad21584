use meetia_core::{SignalKind, UserId};
use meetia_rtc::{SessionConfig, SignalTransport, TransportEvent, TransportState};

use crate::integration::{TEST_MEETING, init_tracing, remote_answer, remote_offer};
use crate::utils::{MockRelay, NETWORK_TIMEOUT_MS, RelayConnection, next_transport_event};

#[tokio::test]
async fn test_transport_connects_with_token() {
    init_tracing();

    let mut relay = MockRelay::start().await.expect("Failed to start relay");
    let config = SessionConfig::new(&relay.api_url(), TEST_MEETING, "alice", "s3cret")
        .expect("Failed to build config");

    let (transport, mut events) = SignalTransport::connect(&config).expect("Failed to connect");

    next_transport_event(&mut events, NETWORK_TIMEOUT_MS, |e| {
        matches!(e, TransportEvent::State(TransportState::Open))
    })
    .await
    .expect("Transport should report open");
    let TransportEvent::Opened(link) = next_transport_event(&mut events, NETWORK_TIMEOUT_MS, |e| {
        matches!(e, TransportEvent::Opened(_))
    })
    .await
    .expect("Transport should hand out a link") else {
        unreachable!()
    };
    assert_eq!(link.id(), 1);

    assert_eq!(
        relay.accepted().await,
        vec![RelayConnection {
            meeting_id: TEST_MEETING.to_string(),
            token: Some("s3cret".to_string()),
        }]
    );

    // Outbound
    let offer = remote_offer("alice", "v=0 alice offer");
    link.send(&offer).expect("Failed to send");
    assert_eq!(
        relay.recv(NETWORK_TIMEOUT_MS).await.expect("Relay should receive"),
        offer
    );

    // Inbound, with a malformed frame in between that is skipped
    relay.wait_for_live_clients(1, NETWORK_TIMEOUT_MS).await.expect("client registered");
    relay.push_raw("{not json").await;
    relay
        .push(&remote_answer("bob", "v=0 bob answer", "alice"))
        .await
        .expect("Failed to push");

    let TransportEvent::Message(message) =
        next_transport_event(&mut events, NETWORK_TIMEOUT_MS, |e| {
            matches!(e, TransportEvent::Message(_))
        })
        .await
        .expect("Transport should deliver the answer")
    else {
        unreachable!()
    };
    assert_eq!(message.kind, SignalKind::Answer);
    assert_eq!(message.target, Some(UserId::from("alice")));

    transport.join().await;
    assert!(!link.is_open());
}
