use crate::error::PeerError;
use crate::media::LocalTrack;
use crate::peer::{
    ConnectionState, PeerConnection, PeerConnector, PeerEvent, PeerEventSink, SenderId,
    SessionDescription, SignalingState,
};
use meetia_core::{IceCandidateInit, IceServerConfig, MeetingId, SignalMessage, StreamInfo, UserId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerPhase {
    /// No instance created yet.
    Idle,
    Active,
    /// The current instance reached a terminal connection state.
    Failed,
    /// Session left. Nothing is created after this.
    Closed,
}

/// Why the current instance is being replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReinitReason {
    TransportOpened,
    /// Answer arrived outside `have-local-offer` on a connection that is
    /// neither up nor coming up.
    UnexpectedAnswer,
    /// Answer arrived in `have-local-offer` but could not be applied.
    AnswerRejected,
    Rejoin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Applied,
    /// Stale or duplicate answer on a connection that already works.
    Discarded,
    /// The two sides diverged. The caller must recreate the connection.
    Reinitialize(ReinitReason),
}

/// Owns the single peer connection instance of a session and drives the
/// offer/answer state machine on it.
pub struct PeerManager {
    user_id: UserId,
    meeting_id: MeetingId,
    ice_servers: Vec<IceServerConfig>,
    connector: Arc<dyn PeerConnector>,
    events_tx: mpsc::UnboundedSender<PeerEvent>,
    connection: Option<Box<dyn PeerConnection>>,
    generation: u64,
    phase: PeerPhase,
}

impl PeerManager {
    pub fn new(
        user_id: UserId,
        meeting_id: MeetingId,
        ice_servers: Vec<IceServerConfig>,
        connector: Arc<dyn PeerConnector>,
        events_tx: mpsc::UnboundedSender<PeerEvent>,
    ) -> Self {
        Self {
            user_id,
            meeting_id,
            ice_servers,
            connector,
            events_tx,
            connection: None,
            generation: 0,
            phase: PeerPhase::Idle,
        }
    }

    pub fn phase(&self) -> PeerPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.connection.is_some() && generation == self.generation
    }

    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    pub fn signaling_state(&self) -> Option<SignalingState> {
        self.connection.as_ref().map(|c| c.signaling_state())
    }

    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.connection.as_ref().map(|c| c.connection_state())
    }

    fn current(&self) -> Result<&dyn PeerConnection, PeerError> {
        self.connection.as_deref().ok_or(PeerError::NoConnection)
    }

    /// Replaces any existing instance with a fresh one. The old instance is
    /// closed before the new one is created.
    pub async fn initialize(&mut self) -> Result<u64, PeerError> {
        if self.phase == PeerPhase::Closed {
            return Err(PeerError::InvalidState(SignalingState::Closed.to_string()));
        }
        self.teardown().await;

        self.generation += 1;
        let sink = PeerEventSink::new(self.generation, self.events_tx.clone());

        match self.connector.connect(&self.ice_servers, sink).await {
            Ok(connection) => {
                self.connection = Some(connection);
                self.phase = PeerPhase::Active;
                info!(
                    user = %self.user_id,
                    generation = self.generation,
                    "Peer connection initialized"
                );
                Ok(self.generation)
            }
            Err(e) => {
                self.phase = PeerPhase::Failed;
                error!(user = %self.user_id, "Failed to create peer connection: {}", e);
                Err(e)
            }
        }
    }

    pub async fn reinitialize(&mut self, reason: ReinitReason) -> Result<u64, PeerError> {
        info!(
            user = %self.user_id,
            generation = self.generation,
            ?reason,
            "Recreating peer connection"
        );
        self.initialize().await
    }

    async fn teardown(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        if let Err(e) = connection.close().await {
            warn!(generation = self.generation, "Error closing peer connection: {}", e);
        }
    }

    /// Closes the current instance. Safe to call repeatedly.
    pub async fn close(&mut self) {
        self.teardown().await;
        self.phase = PeerPhase::Closed;
    }

    /// Applies a remote offer and returns the answer addressed to its sender.
    pub async fn handle_offer(&self, message: &SignalMessage) -> Result<SignalMessage, PeerError> {
        let connection = self.current()?;
        let sdp = message.sdp.clone().ok_or(PeerError::MissingField("sdp"))?;

        connection
            .set_remote_description(SessionDescription::offer(sdp))
            .await?;
        let answer = connection.create_answer().await?;
        connection.set_local_description(answer.clone()).await?;

        debug!(from = %message.user_id, "Answering remote offer");
        Ok(SignalMessage::answer(
            self.user_id.clone(),
            self.meeting_id.clone(),
            answer.sdp,
            Some(message.user_id.clone()),
        ))
    }

    pub async fn handle_answer(&self, message: &SignalMessage) -> Result<AnswerOutcome, PeerError> {
        let connection = self.current()?;
        let sdp = message.sdp.clone().ok_or(PeerError::MissingField("sdp"))?;

        let signaling = connection.signaling_state();
        if signaling != SignalingState::HaveLocalOffer {
            let state = connection.connection_state();
            if state.is_up_or_establishing() {
                debug!(%signaling, %state, from = %message.user_id, "Discarding stale answer");
                return Ok(AnswerOutcome::Discarded);
            }
            warn!(%signaling, %state, from = %message.user_id, "Answer in unexpected state");
            return Ok(AnswerOutcome::Reinitialize(ReinitReason::UnexpectedAnswer));
        }

        match connection
            .set_remote_description(SessionDescription::answer(sdp))
            .await
        {
            Ok(()) => Ok(AnswerOutcome::Applied),
            Err(e) => {
                warn!(from = %message.user_id, "Failed to apply answer: {}", e);
                Ok(AnswerOutcome::Reinitialize(ReinitReason::AnswerRejected))
            }
        }
    }

    pub async fn handle_candidate(&self, message: &SignalMessage) -> Result<(), PeerError> {
        let connection = self.current()?;
        let candidate = message
            .candidate
            .clone()
            .ok_or(PeerError::MissingField("candidate"))?;
        connection.add_ice_candidate(candidate).await
    }

    /// Creates a new local offer, applies it, and returns it as a signal
    /// announcing `streams`.
    pub async fn renegotiate(&self, streams: Vec<StreamInfo>) -> Result<SignalMessage, PeerError> {
        let connection = self.current()?;
        let offer = connection.create_offer().await?;
        connection.set_local_description(offer.clone()).await?;

        Ok(SignalMessage::offer(self.user_id.clone(), self.meeting_id.clone(), offer.sdp)
            .with_streams(streams))
    }

    /// Wraps a locally gathered candidate, or drops it when it belongs to a
    /// replaced instance or arrives mid renegotiation.
    pub fn outbound_candidate(
        &self,
        generation: u64,
        candidate: IceCandidateInit,
    ) -> Option<SignalMessage> {
        if !self.is_current(generation) {
            debug!(generation, current = self.generation, "Dropping candidate of old instance");
            return None;
        }

        let state = self.current().ok()?.signaling_state();
        if !state.accepts_local_candidates() {
            debug!(%state, "Dropping local candidate");
            return None;
        }

        Some(SignalMessage::candidate(
            self.user_id.clone(),
            self.meeting_id.clone(),
            candidate,
        ))
    }

    /// Records a connection state change. Returns true when it moved the
    /// current instance into a terminal state.
    pub fn observe_connection_state(&mut self, generation: u64, state: ConnectionState) -> bool {
        if !self.is_current(generation) || self.phase != PeerPhase::Active {
            return false;
        }
        if !state.is_terminal() {
            return false;
        }
        self.phase = PeerPhase::Failed;
        true
    }

    pub async fn attach(&self, track: &LocalTrack) -> Result<SenderId, PeerError> {
        self.current()?.add_track(track).await
    }

    pub async fn detach(&self, sender: SenderId) -> Result<(), PeerError> {
        self.current()?.remove_track(sender).await
    }
}
