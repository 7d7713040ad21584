use crate::media::LocalStream;
use crate::peer::{ConnectionState, IceConnectionState, PeerPhase, SignalingState};
use crate::tracks::{RemoteTrack, TrackFilter};
use crate::transport::TransportState;

/// Observable state of a session, published after every change.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Signal transport open and a peer connection present.
    pub connection_open: bool,
    /// True until the first remote track arrives or an error is recorded.
    pub loading: bool,
    pub last_error: Option<String>,
    pub local_stream: Option<LocalStream>,
    pub screen_stream: Option<LocalStream>,
    pub muted: bool,
    pub video_enabled: bool,
    pub screen_sharing: bool,
    pub remote_tracks: Vec<RemoteTrack>,
    /// Outbound signals waiting for an open transport.
    pub pending_signals: usize,
    pub transport_state: TransportState,
    pub peer_phase: PeerPhase,
    pub signaling_state: Option<SignalingState>,
    pub connection_state: Option<ConnectionState>,
    pub ice_connection_state: Option<IceConnectionState>,
    /// The session has been torn down.
    pub closed: bool,
}

impl SessionSnapshot {
    pub fn initial() -> Self {
        Self {
            connection_open: false,
            loading: true,
            last_error: None,
            local_stream: None,
            screen_stream: None,
            muted: false,
            video_enabled: true,
            screen_sharing: false,
            remote_tracks: Vec::new(),
            pending_signals: 0,
            transport_state: TransportState::Connecting,
            peer_phase: PeerPhase::Idle,
            signaling_state: None,
            connection_state: None,
            ice_connection_state: None,
            closed: false,
        }
    }

    pub fn remote_view(&self, filter: &TrackFilter) -> Vec<&RemoteTrack> {
        self.remote_tracks
            .iter()
            .filter(|t| filter.matches(t))
            .collect()
    }
}
