use crate::transport::ConnectionHandle;
use meetia_core::SignalMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Connecting,
    Open,
    Closed,
    Reconnecting,
}

/// Events the signal transport emits towards the session loop.
#[derive(Debug)]
pub enum TransportEvent {
    State(TransportState),

    /// A fresh physical connection is ready. Outbound messages go through
    /// this handle until the next `Closed`.
    Opened(ConnectionHandle),

    /// A decoded message from the relay.
    Message(SignalMessage),

    /// The current connection ended. `clean` means a close handshake took
    /// place and no reconnect follows.
    Closed { clean: bool },

    /// Connect or socket failure. Reconnect is handled by the transport.
    Error(String),

    /// Reconnect budget exhausted, the transport has stopped.
    GaveUp { attempts: u32 },
}
