use crate::config::{ReconnectPolicy, SessionConfig};
use crate::error::TransportError;
use crate::transport::{ConnectionHandle, TransportEvent, TransportState};
use futures::{SinkExt, StreamExt};
use meetia_core::SignalMessage;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum ConnectionEnd {
    /// Close handshake seen, stop for good.
    Clean,
    /// Socket dropped, retry per policy.
    Dropped,
    /// Owner asked to stop.
    Shutdown,
    /// Nobody listens to events anymore.
    Orphaned,
}

/// Owner side of a running transport. Dropping it shuts the transport down.
pub struct TransportHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TransportHandle {
    /// Sends a close frame on the current connection and stops reconnecting.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) {
        let Self { shutdown_tx, task } = self;
        let _ = shutdown_tx.send(true);
        let _ = task.await;
    }
}

/// Reconnecting WebSocket link to the signaling relay.
pub struct SignalTransport;

impl SignalTransport {
    /// Connects to the relay for `config.meeting_id`, authenticating with
    /// `config.token`.
    pub fn connect(
        config: &SessionConfig,
    ) -> Result<(TransportHandle, mpsc::Receiver<TransportEvent>), TransportError> {
        let url = config.signal_url()?;
        Ok(Self::spawn(url, config.reconnect))
    }

    pub fn spawn(
        url: Url,
        policy: ReconnectPolicy,
    ) -> (TransportHandle, mpsc::Receiver<TransportEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run(url, policy, event_tx, shutdown_rx));

        (TransportHandle { shutdown_tx, task }, event_rx)
    }
}

async fn run(
    url: Url,
    policy: ReconnectPolicy,
    events: mpsc::Sender<TransportEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut failures: u32 = 0;
    let mut next_id: u64 = 0;

    // The token is part of the url, keep it out of the logs.
    let endpoint = format!("{}{}", url.origin().ascii_serialization(), url.path());
    info!(%endpoint, "Signal transport started");

    loop {
        if failures == 0 && events.send(TransportEvent::State(TransportState::Connecting)).await.is_err() {
            return;
        }

        let connected = tokio::select! {
            _ = shutdown.changed() => return,
            res = connect_async(url.as_str()) => res,
        };

        let end = match connected {
            Ok((stream, _)) => {
                failures = 0;
                next_id += 1;
                info!(%endpoint, connection = next_id, "Signal connection open");
                drive(next_id, stream, &events, &mut shutdown).await
            }
            Err(e) => {
                warn!(%endpoint, "Signal connect failed: {}", e);
                if events.send(TransportEvent::Error(e.to_string())).await.is_err() {
                    return;
                }
                ConnectionEnd::Dropped
            }
        };

        match end {
            ConnectionEnd::Clean => {
                info!(%endpoint, "Signal connection closed cleanly");
                let _ = events.send(TransportEvent::State(TransportState::Closed)).await;
                let _ = events.send(TransportEvent::Closed { clean: true }).await;
                return;
            }
            ConnectionEnd::Shutdown => {
                debug!(%endpoint, "Signal transport shut down");
                let _ = events.try_send(TransportEvent::State(TransportState::Closed));
                return;
            }
            ConnectionEnd::Orphaned => return,
            ConnectionEnd::Dropped => {}
        }

        let _ = events.send(TransportEvent::Closed { clean: false }).await;
        failures += 1;

        let Some(delay) = policy.next_delay(failures) else {
            warn!(%endpoint, attempts = failures - 1, "Giving up on signal connection");
            let _ = events.send(TransportEvent::State(TransportState::Closed)).await;
            let _ = events
                .send(TransportEvent::GaveUp {
                    attempts: failures - 1,
                })
                .await;
            return;
        };

        info!(%endpoint, attempt = failures, max = policy.max_attempts, "Reconnecting in {:?}", delay);
        if events
            .send(TransportEvent::State(TransportState::Reconnecting))
            .await
            .is_err()
        {
            return;
        }

        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

async fn drive(
    id: u64,
    stream: WsStream,
    events: &mpsc::Sender<TransportEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> ConnectionEnd {
    let (mut write, mut read) = stream.split();
    let (handle, mut outbound_rx) = ConnectionHandle::channel(id);

    if events.send(TransportEvent::State(TransportState::Open)).await.is_err()
        || events.send(TransportEvent::Opened(handle)).await.is_err()
    {
        return ConnectionEnd::Orphaned;
    }

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => {
                let _ = write.send(Message::Close(None)).await;
                return ConnectionEnd::Shutdown;
            }

            Some(text) = outbound_rx.recv() => {
                if let Err(e) = write.send(Message::Text(text)).await {
                    warn!(connection = id, "Failed to write signal: {}", e);
                    return ConnectionEnd::Dropped;
                }
            }

            frame = read.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                        Ok(text) => text,
                        Err(_) => {
                            warn!(connection = id, "Dropping non UTF-8 binary frame");
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        debug!(connection = id, ?frame, "Relay closed the connection");
                        return ConnectionEnd::Clean;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                        debug!(connection = id, "Signal socket closed");
                        return ConnectionEnd::Dropped;
                    }
                    Some(Err(e)) => {
                        warn!(connection = id, "Signal socket error: {}", e);
                        let _ = events.send(TransportEvent::Error(e.to_string())).await;
                        return ConnectionEnd::Dropped;
                    }
                    None => return ConnectionEnd::Dropped,
                };

                match SignalMessage::from_json(&text) {
                    Ok(message) => {
                        if events.send(TransportEvent::Message(message)).await.is_err() {
                            return ConnectionEnd::Orphaned;
                        }
                    }
                    Err(e) => warn!(connection = id, "Failed to parse signal message: {}", e),
                }
            }
        }
    }
}
