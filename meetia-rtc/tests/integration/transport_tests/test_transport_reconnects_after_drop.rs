use std::time::Duration;

use meetia_rtc::{ReconnectPolicy, SessionConfig, SignalTransport, TransportEvent, TransportState};

use crate::integration::{TEST_MEETING, init_tracing, remote_offer};
use crate::utils::{MockRelay, NETWORK_TIMEOUT_MS, next_transport_event};

#[tokio::test]
async fn test_transport_reconnects_after_drop() {
    init_tracing();

    let mut relay = MockRelay::start().await.expect("Failed to start relay");
    let config = SessionConfig::new(&relay.api_url(), TEST_MEETING, "alice", "token")
        .expect("Failed to build config")
        .with_reconnect(ReconnectPolicy {
            max_attempts: 3,
            interval: Duration::from_millis(50),
        });

    let (transport, mut events) = SignalTransport::connect(&config).expect("Failed to connect");

    let TransportEvent::Opened(first) = next_transport_event(&mut events, NETWORK_TIMEOUT_MS, |e| {
        matches!(e, TransportEvent::Opened(_))
    })
    .await
    .expect("First connection") else {
        unreachable!()
    };
    relay
        .wait_for_live_clients(1, NETWORK_TIMEOUT_MS)
        .await
        .expect("client registered");

    // Kill the socket without a close handshake
    relay.drop_clients().await;

    next_transport_event(&mut events, NETWORK_TIMEOUT_MS, |e| {
        matches!(e, TransportEvent::Closed { clean: false })
    })
    .await
    .expect("Drop should be reported as unclean");
    next_transport_event(&mut events, NETWORK_TIMEOUT_MS, |e| {
        matches!(e, TransportEvent::State(TransportState::Reconnecting))
    })
    .await
    .expect("Transport should reconnect");

    let TransportEvent::Opened(second) = next_transport_event(&mut events, NETWORK_TIMEOUT_MS, |e| {
        matches!(e, TransportEvent::Opened(_))
    })
    .await
    .expect("Second connection") else {
        unreachable!()
    };
    assert_eq!(second.id(), first.id() + 1);
    assert!(!first.is_open(), "Old link must not reach the new connection");
    assert_eq!(relay.accepted().await.len(), 2);

    let offer = remote_offer("alice", "v=0 after reconnect");
    assert!(first.send(&offer).is_err());
    second.send(&offer).expect("Failed to send on new link");
    assert_eq!(
        relay.recv(NETWORK_TIMEOUT_MS).await.expect("Relay should receive"),
        offer
    );

    transport.join().await;
}
