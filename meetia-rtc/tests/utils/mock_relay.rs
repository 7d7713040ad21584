use anyhow::{Context, Result, bail};
use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use meetia_core::SignalMessage;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

/// One WebSocket upgrade request seen by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConnection {
    pub meeting_id: String,
    pub token: Option<String>,
}

#[derive(Clone)]
struct RelayState {
    inbound_tx: mpsc::UnboundedSender<String>,
    clients: Arc<Mutex<Vec<mpsc::UnboundedSender<Message>>>>,
    accepted: Arc<Mutex<Vec<RelayConnection>>>,
}

/// In-process signaling relay on a random local port. Records what clients
/// send and lets tests push, close, or drop connections.
pub struct MockRelay {
    addr: SocketAddr,
    state: RelayState,
    inbound_rx: mpsc::UnboundedReceiver<String>,
    server: JoinHandle<()>,
}

impl MockRelay {
    pub async fn start() -> Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind relay listener")?;
        let addr = listener.local_addr()?;

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let state = RelayState {
            inbound_tx,
            clients: Arc::new(Mutex::new(Vec::new())),
            accepted: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/api/rtc/signal/{meeting_id}", get(ws_handler))
            .with_state(state.clone());

        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("[MockRelay] Server error: {}", e);
            }
        });
        tracing::debug!("[MockRelay] Listening on {}", addr);

        Ok(Self {
            addr,
            state,
            inbound_rx,
            server,
        })
    }

    /// Base URL to hand to `SessionConfig::new`.
    pub fn api_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn accepted(&self) -> Vec<RelayConnection> {
        self.state.accepted.lock().await.clone()
    }

    pub async fn live_clients(&self) -> usize {
        self.state
            .clients
            .lock()
            .await
            .iter()
            .filter(|c| !c.is_closed())
            .count()
    }

    pub async fn wait_for_live_clients(&self, count: usize, timeout_ms: u64) -> Result<()> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        while self.live_clients().await < count {
            if tokio::time::Instant::now() >= deadline {
                bail!("Timeout waiting for {} live relay clients", count);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(())
    }

    pub async fn wait_for_no_clients(&self, timeout_ms: u64) -> Result<()> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        while self.live_clients().await > 0 {
            if tokio::time::Instant::now() >= deadline {
                bail!("Timeout waiting for relay clients to leave");
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(())
    }

    /// Sends raw text to every live client. Returns how many got it.
    pub async fn push_raw(&self, text: &str) -> usize {
        self.state
            .clients
            .lock()
            .await
            .iter()
            .filter(|c| c.send(Message::Text(text.into())).is_ok())
            .count()
    }

    pub async fn push(&self, message: &SignalMessage) -> Result<usize> {
        let json = message.to_json()?;
        Ok(self.push_raw(&json).await)
    }

    /// Ends every connection with a close frame.
    pub async fn close_clients(&self) {
        let mut clients = self.state.clients.lock().await;
        for client in clients.drain(..) {
            let _ = client.send(Message::Close(None));
        }
    }

    /// Ends every connection without a close handshake.
    pub async fn drop_clients(&self) {
        self.state.clients.lock().await.clear();
    }

    /// Next message a client sent, parsed.
    pub async fn recv(&mut self, timeout_ms: u64) -> Result<SignalMessage> {
        let text = tokio::time::timeout(Duration::from_millis(timeout_ms), self.inbound_rx.recv())
            .await
            .context("Timeout waiting for client message")?
            .context("Relay stopped")?;
        SignalMessage::from_json(&text).context("Client sent invalid signal JSON")
    }
}

impl Drop for MockRelay {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(meeting_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<RelayState>,
) -> impl IntoResponse {
    state.accepted.lock().await.push(RelayConnection {
        meeting_id,
        token: params.get("token").cloned(),
    });
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: RelayState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    state.clients.lock().await.push(tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let inbound_tx = state.inbound_tx.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                let _ = inbound_tx.send(text.to_string());
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetia_core::{MeetingId, UserId};
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    #[tokio::test]
    async fn test_relay_records_and_pushes() {
        let mut relay = MockRelay::start().await.expect("relay should start");
        let url = format!("ws://{}/api/rtc/signal/m-1?token=secret", relay.addr);

        let (mut client, _) = connect_async(url.as_str())
            .await
            .expect("client should connect");
        relay
            .wait_for_live_clients(1, 2000)
            .await
            .expect("client should register");

        assert_eq!(
            relay.accepted().await,
            vec![RelayConnection {
                meeting_id: "m-1".to_string(),
                token: Some("secret".to_string()),
            }]
        );

        let offer = SignalMessage::offer(UserId::from("a"), MeetingId::from("m-1"), "v=0".into());
        client
            .send(WsMessage::Text(offer.to_json().unwrap()))
            .await
            .expect("send should work");
        assert_eq!(relay.recv(2000).await.expect("relay should receive"), offer);

        assert_eq!(relay.push(&offer).await.unwrap(), 1);
        let echoed = client.next().await.expect("frame").expect("no error");
        assert_eq!(echoed, WsMessage::Text(offer.to_json().unwrap()));
    }
}
