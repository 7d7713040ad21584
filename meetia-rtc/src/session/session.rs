use crate::config::SessionConfig;
use crate::error::{PeerError, SessionError};
use crate::media::{LocalMedia, LocalStream, MediaConstraints, MediaDevices, MediaEvent};
use crate::peer::{
    AnswerOutcome, IceConnectionState, PeerConnector, PeerEvent, PeerEventKind, PeerManager,
    ReinitReason,
};
use crate::session::{SessionCommand, SessionHandle, SessionSnapshot};
use crate::signaling::PendingSignalQueue;
use crate::tracks::{RemoteTrackRegistry, StreamDirectory, TrackFilter, classify};
use crate::transport::{
    ConnectionHandle, SignalTransport, TransportEvent, TransportHandle, TransportState,
};
use meetia_core::{SignalKind, SignalMessage};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Connects to the relay and spawns the session loop.
pub fn join(
    config: SessionConfig,
    connector: Arc<dyn PeerConnector>,
    devices: Arc<dyn MediaDevices>,
) -> Result<SessionHandle, SessionError> {
    let (transport, transport_rx) = SignalTransport::connect(&config)?;
    let (session, handle) = Session::new(config, connector, devices, transport_rx);
    tokio::spawn(session.with_transport(transport).run());
    Ok(handle)
}

/// One participant in one meeting. All state changes happen on the task
/// running [`Session::run`].
pub struct Session {
    config: SessionConfig,
    peer: PeerManager,
    media: LocalMedia,
    registry: RemoteTrackRegistry,
    directory: StreamDirectory,
    queue: PendingSignalQueue,
    link: Option<ConnectionHandle>,
    transport: Option<TransportHandle>,
    transport_state: TransportState,
    ice_state: Option<IceConnectionState>,
    loading: bool,
    last_error: Option<String>,
    closed: bool,
    command_rx: mpsc::Receiver<SessionCommand>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    peer_rx: mpsc::UnboundedReceiver<PeerEvent>,
    media_rx: mpsc::UnboundedReceiver<MediaEvent>,
    state_tx: watch::Sender<SessionSnapshot>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        connector: Arc<dyn PeerConnector>,
        devices: Arc<dyn MediaDevices>,
        transport_rx: mpsc::Receiver<TransportEvent>,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        let (media_tx, media_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionSnapshot::initial());

        let peer = PeerManager::new(
            config.user_id.clone(),
            config.meeting_id.clone(),
            config.ice_servers.clone(),
            connector,
            peer_tx,
        );
        let media = LocalMedia::new(config.user_id.clone(), devices, media_tx);

        let session = Self {
            config,
            peer,
            media,
            registry: RemoteTrackRegistry::new(),
            directory: StreamDirectory::new(),
            queue: PendingSignalQueue::new(),
            link: None,
            transport: None,
            transport_state: TransportState::Connecting,
            ice_state: None,
            loading: true,
            last_error: None,
            closed: false,
            command_rx,
            transport_rx,
            peer_rx,
            media_rx,
            state_tx,
        };

        (session, SessionHandle::new(command_tx, state_rx))
    }

    /// Ties the transport lifetime to the session.
    pub fn with_transport(mut self, transport: TransportHandle) -> Self {
        self.transport = Some(transport);
        self
    }

    pub async fn run(mut self) {
        info!(
            meeting = %self.config.meeting_id,
            user = %self.config.user_id,
            "Session event loop started"
        );

        let mut flush_tick = tokio::time::interval(self.config.flush_interval);
        flush_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                Some(evt) = self.transport_rx.recv() => self.handle_transport_event(evt).await,

                Some(evt) = self.peer_rx.recv() => self.handle_peer_event(evt).await,

                Some(evt) = self.media_rx.recv() => self.handle_media_event(evt).await,

                cmd = self.command_rx.recv() => match cmd {
                    Some(c) => self.handle_command(c).await,
                    None => {
                        info!("All session handles dropped");
                        self.teardown().await;
                    }
                },

                _ = flush_tick.tick() => {
                    self.flush_pending();
                    continue;
                }
            }

            self.publish();
            if self.closed {
                break;
            }
        }

        info!(meeting = %self.config.meeting_id, "Session event loop finished");
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::State(state) => {
                debug!(?state, "Signal transport state");
                self.transport_state = state;
            }

            TransportEvent::Opened(link) => {
                info!(connection = link.id(), "Signal transport open");
                self.link = Some(link);
                let _ = self.reinitialize(ReinitReason::TransportOpened).await;
                self.flush();
            }

            TransportEvent::Message(message) => self.handle_signal(message).await,

            TransportEvent::Closed { clean } => {
                self.link = None;
                if clean {
                    info!("Signal transport closed by relay");
                } else {
                    warn!("Signal transport dropped");
                }
            }

            TransportEvent::Error(e) => warn!("Signal transport error: {}", e),

            TransportEvent::GaveUp { attempts } => {
                self.link = None;
                self.fail(format!(
                    "Failed to connect to signaling server after {attempts} attempts"
                ));
            }
        }
    }

    async fn handle_signal(&mut self, message: SignalMessage) {
        if !self.peer.has_connection() {
            debug!(kind = ?message.kind, from = %message.user_id, "No peer connection, ignoring signal");
            return;
        }
        if !message.is_addressed_to(&self.config.user_id) {
            debug!(kind = ?message.kind, target = ?message.target, "Signal addressed to someone else");
            return;
        }

        match message.kind {
            SignalKind::Offer => {
                self.directory.record(&message.streams);
                match self.peer.handle_offer(&message).await {
                    Ok(answer) => self.send(answer),
                    Err(e) => warn!(from = %message.user_id, "Failed to handle offer: {}", e),
                }
            }

            SignalKind::Answer => match self.peer.handle_answer(&message).await {
                Ok(AnswerOutcome::Applied) => debug!(from = %message.user_id, "Answer applied"),
                Ok(AnswerOutcome::Discarded) => {}
                Ok(AnswerOutcome::Reinitialize(reason)) => {
                    let _ = self.reinitialize(reason).await;
                }
                Err(e) => warn!(from = %message.user_id, "Failed to handle answer: {}", e),
            },

            SignalKind::Candidate => {
                if let Err(e) = self.peer.handle_candidate(&message).await {
                    warn!(from = %message.user_id, "Failed to add ICE candidate: {}", e);
                }
            }
        }
    }

    async fn handle_peer_event(&mut self, event: PeerEvent) {
        let PeerEvent { generation, kind } = event;
        if !self.peer.is_current(generation) {
            debug!(generation, "Ignoring event from replaced peer connection");
            return;
        }

        match kind {
            PeerEventKind::LocalCandidate(candidate) => {
                if let Some(message) = self.peer.outbound_candidate(generation, candidate) {
                    self.send(message);
                }
            }

            PeerEventKind::RemoteTrack(media) => {
                let track = classify(media, &self.directory);
                info!(
                    participant = %track.participant,
                    kind = %track.kind,
                    track = %track.track_id,
                    "Remote track added"
                );
                self.registry.upsert(track);
                self.loading = false;
            }

            PeerEventKind::RemoteTrackEnded { track_id } => {
                if self.registry.remove(&track_id).is_some() {
                    info!(track = %track_id, "Remote track removed");
                }
            }

            PeerEventKind::ConnectionState(state) => {
                if self.peer.observe_connection_state(generation, state) {
                    self.fail(format!("Peer connection {state}"));
                }
            }

            PeerEventKind::IceConnectionState(state) => self.ice_state = Some(state),

            PeerEventKind::SignalingState(state) => debug!(%state, "Signaling state"),
        }
    }

    async fn handle_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::ScreenTrackEnded { stream_id } => {
                let current = self.media.screen().is_some_and(|s| s.id() == stream_id);
                if current {
                    info!(stream = %stream_id, "Screen capture ended by source");
                    self.stop_screen_share().await;
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::StartLocalStream { constraints, reply } => {
                let res = self.start_local_stream(constraints).await;
                let _ = reply.send(res);
            }

            SessionCommand::ToggleAudio { reply } => {
                let _ = reply.send(self.media.toggle_audio());
            }

            SessionCommand::ToggleVideo { reply } => {
                let _ = reply.send(self.media.toggle_video());
            }

            SessionCommand::StartScreenShare { reply } => {
                let res = self.start_screen_share().await;
                let _ = reply.send(res);
            }

            SessionCommand::StopScreenShare { reply } => {
                let stopped = self.stop_screen_share().await;
                let _ = reply.send(stopped);
            }

            SessionCommand::Rejoin { reply } => {
                let res = self
                    .reinitialize(ReinitReason::Rejoin)
                    .await
                    .map_err(SessionError::from);
                let _ = reply.send(res);
            }

            SessionCommand::Disconnect { reply } => {
                self.teardown().await;
                self.publish();
                let _ = reply.send(());
            }
        }
    }

    async fn start_local_stream(
        &mut self,
        constraints: MediaConstraints,
    ) -> Result<LocalStream, SessionError> {
        match self.media.start_local_stream(&self.peer, constraints).await {
            Ok(stream) => {
                self.renegotiate().await;
                Ok(stream)
            }
            Err(e) => {
                self.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn start_screen_share(&mut self) -> Result<LocalStream, SessionError> {
        match self.media.start_screen_share(&self.peer).await {
            Ok(stream) => {
                self.renegotiate().await;
                Ok(stream)
            }
            Err(e) => {
                self.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn stop_screen_share(&mut self) -> bool {
        let stopped = self.media.stop_screen_share(&self.peer).await;
        if stopped && self.config.renegotiate_on_screen_share_stop {
            self.renegotiate().await;
        }
        stopped
    }

    /// Replaces the peer connection and brings local tracks over to it.
    async fn reinitialize(&mut self, reason: ReinitReason) -> Result<(), PeerError> {
        self.registry.clear();
        self.directory.clear();
        self.ice_state = None;

        let created = self.peer.reinitialize(reason).await;

        let generation = self.peer.generation();
        let dropped = self.queue.drop_negotiation_before(generation);
        if dropped > 0 {
            debug!(dropped, generation, "Dropped queued negotiation of replaced peer connection");
        }

        if let Err(e) = created {
            self.fail(format!("Failed to create peer connection: {e}"));
            return Err(e);
        }
        self.loading = true;
        self.last_error = None;

        match self.media.reattach(&self.peer).await {
            Ok(0) => {}
            Ok(attached) => {
                debug!(attached, "Local tracks attached to new peer connection");
                self.renegotiate().await;
            }
            Err(e) => self.fail(format!("Failed to attach local tracks: {e}")),
        }
        Ok(())
    }

    async fn renegotiate(&mut self) {
        if !self.peer.has_connection() {
            return;
        }
        match self.peer.renegotiate(self.media.announcements()).await {
            Ok(offer) => self.send(offer),
            Err(e) => warn!("Failed to create offer: {}", e),
        }
    }

    /// Every outbound signal goes through the queue.
    fn send(&mut self, message: SignalMessage) {
        self.queue.enqueue(self.peer.generation(), message);
        self.flush();
    }

    /// Periodic retry. Publishes only when something went out.
    fn flush_pending(&mut self) {
        if self.flush() > 0 {
            self.publish();
        }
    }

    fn flush(&mut self) -> usize {
        let Some(link) = &self.link else {
            return 0;
        };
        let delivered = self.queue.flush(|message| link.send(message));
        let open = link.is_open();

        if delivered > 0 {
            debug!(delivered, pending = self.queue.len(), "Flushed signals");
        }
        if !open {
            self.link = None;
        }
        delivered
    }

    fn fail(&mut self, message: String) {
        error!("{}", message);
        self.last_error = Some(message);
        self.loading = false;
    }

    /// Stops local tracks, closes the peer connection, drops pending
    /// signals and remote tracks, shuts the transport down.
    async fn teardown(&mut self) {
        if self.closed {
            return;
        }

        let stopped = self.media.release_all();
        self.peer.close().await;
        self.queue.clear();
        self.registry.clear();
        self.directory.clear();
        self.link = None;
        if let Some(transport) = self.transport.take() {
            transport.shutdown();
        }
        self.transport_state = TransportState::Closed;
        self.ice_state = None;
        self.loading = false;
        self.closed = true;

        info!(
            meeting = %self.config.meeting_id,
            stopped_tracks = stopped,
            "Session disconnected"
        );
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connection_open: self.link.as_ref().is_some_and(ConnectionHandle::is_open)
                && self.peer.has_connection(),
            loading: self.loading,
            last_error: self.last_error.clone(),
            local_stream: self.media.camera().cloned(),
            screen_stream: self.media.screen().cloned(),
            muted: self.media.is_muted(),
            video_enabled: self.media.is_video_enabled(),
            screen_sharing: self.media.is_screen_sharing(),
            remote_tracks: self.registry.view(&TrackFilter::all()),
            pending_signals: self.queue.len(),
            transport_state: self.transport_state,
            peer_phase: self.peer.phase(),
            signaling_state: self.peer.signaling_state(),
            connection_state: self.peer.connection_state(),
            ice_connection_state: self.ice_state,
            closed: self.closed,
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.snapshot());
    }
}
