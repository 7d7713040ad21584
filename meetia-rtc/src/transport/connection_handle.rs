use crate::error::TransportError;
use meetia_core::SignalMessage;
use tokio::sync::mpsc;

/// Write side of one physical connection to the relay.
///
/// Each reconnect produces a new handle. Sending on a handle whose
/// connection is gone fails instead of reaching the next connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: u64,
    tx: mpsc::UnboundedSender<String>,
}

impl ConnectionHandle {
    pub fn channel(id: u64) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id, tx }, rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    pub fn send(&self, message: &SignalMessage) -> Result<(), TransportError> {
        let text = message.to_json()?;
        self.tx
            .send(text)
            .map_err(|_| TransportError::ConnectionClosed(self.id))
    }
}
