use meetia_core::{SignalKind, UserId};

use crate::integration::{
    create_test_session, default_devices, deliver, init_tracing, remote_offer, wait_state,
};
use crate::utils::{SIGNAL_TIMEOUT_MS, expect_no_signal, open_link, recv_signal};

#[tokio::test]
async fn test_signals_for_others_are_ignored() {
    init_tracing();

    let session = create_test_session(default_devices());
    let mut wire = open_link(&session.transport_tx, 1)
        .await
        .expect("Failed to open link");
    wait_state(&session.handle, |s| s.connection_open).await;

    // Addressed to carol
    let mut for_carol = remote_offer("bob", "v=0 for carol");
    for_carol.target = Some(UserId::from("carol"));
    deliver(&session.transport_tx, for_carol).await;
    expect_no_signal(&mut wire)
        .await
        .expect("Offer for another participant must not be answered");

    // Addressed to us
    let mut for_alice = remote_offer("bob", "v=0 for alice");
    for_alice.target = Some(UserId::from("alice"));
    deliver(&session.transport_tx, for_alice).await;

    let answer = recv_signal(&mut wire, SIGNAL_TIMEOUT_MS)
        .await
        .expect("Offer for us should be answered");
    assert_eq!(answer.kind, SignalKind::Answer);
    assert_eq!(answer.target, Some(UserId::from("bob")));
}
