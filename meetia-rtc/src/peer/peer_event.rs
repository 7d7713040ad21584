use crate::peer::{ConnectionState, IceConnectionState, SignalingState};
use crate::tracks::RemoteMedia;
use meetia_core::IceCandidateInit;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum PeerEventKind {
    /// Trickle ICE: a local candidate was gathered.
    LocalCandidate(IceCandidateInit),

    RemoteTrack(Arc<dyn RemoteMedia>),

    /// The remote side stopped sending on this track.
    RemoteTrackEnded { track_id: String },

    ConnectionState(ConnectionState),

    IceConnectionState(IceConnectionState),

    SignalingState(SignalingState),
}

/// Callback output of one peer connection instance, tagged with the
/// instance generation so the session can drop events from replaced ones.
#[derive(Debug)]
pub struct PeerEvent {
    pub generation: u64,
    pub kind: PeerEventKind,
}

#[derive(Debug, Clone)]
pub struct PeerEventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<PeerEvent>,
}

impl PeerEventSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<PeerEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns false once the session is gone.
    pub fn emit(&self, kind: PeerEventKind) -> bool {
        self.tx
            .send(PeerEvent {
                generation: self.generation,
                kind,
            })
            .is_ok()
    }
}
