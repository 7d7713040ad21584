use crate::error::PeerError;
use crate::media::LocalTrack;
use crate::peer::{
    ConnectionState, PeerConnection, PeerConnector, PeerEventKind, PeerEventSink, SdpKind,
    SenderId, SessionDescription, SignalingState,
};
use crate::tracks::RemoteMedia;
use async_trait::async_trait;
use dashmap::DashMap;
use meetia_core::{IceCandidateInit, IceServerConfig, MediaKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::policy::ice_transport_policy::RTCIceTransportPolicy;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp::packet::Packet;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_remote::TrackRemote;

const PACKET_BUFFER: usize = 256;

/// Inbound track backed by a webrtc-rs `TrackRemote`. RTP packets are
/// fanned out to subscribers.
#[derive(Debug)]
pub struct RtcRemoteTrack {
    track_id: String,
    stream_id: String,
    kind: MediaKind,
    packets: broadcast::Sender<Packet>,
}

impl RtcRemoteTrack {
    pub fn subscribe(&self) -> broadcast::Receiver<Packet> {
        self.packets.subscribe()
    }
}

impl RemoteMedia for RtcRemoteTrack {
    fn track_id(&self) -> &str {
        &self.track_id
    }

    fn stream_id(&self) -> &str {
        &self.stream_id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }
}

/// Builds webrtc-rs peer connections.
#[derive(Debug, Default, Clone)]
pub struct RtcPeerConnector;

impl RtcPeerConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PeerConnector for RtcPeerConnector {
    async fn connect(
        &self,
        ice_servers: &[IceServerConfig],
        events: PeerEventSink,
    ) -> Result<Box<dyn PeerConnection>, PeerError> {
        let peer = RtcPeer::new(ice_servers, events).await?;
        Ok(Box::new(peer))
    }
}

pub struct RtcPeer {
    generation: u64,
    connection: Arc<RTCPeerConnection>,
    senders: DashMap<SenderId, Arc<RTCRtpSender>>,
    next_sender: AtomicU64,
}

impl RtcPeer {
    pub async fn new(
        ice_servers: &[IceServerConfig],
        events: PeerEventSink,
    ) -> Result<Self, PeerError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ice_transport_policy: RTCIceTransportPolicy::All,
            ..Default::default()
        };

        let connection = Arc::new(api.new_peer_connection(rtc_config).await?);
        let generation = events.generation();

        let state_sink = events.clone();
        connection.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let sink = state_sink.clone();
            Box::pin(async move {
                info!(generation = sink.generation(), "Peer connection state: {}", s);
                sink.emit(PeerEventKind::ConnectionState(s.into()));
            })
        }));

        let ice_state_sink = events.clone();
        connection.on_ice_connection_state_change(Box::new(move |s: RTCIceConnectionState| {
            let sink = ice_state_sink.clone();
            Box::pin(async move {
                debug!(generation = sink.generation(), "ICE connection state: {}", s);
                sink.emit(PeerEventKind::IceConnectionState(s.into()));
            })
        }));

        let signaling_sink = events.clone();
        connection.on_signaling_state_change(Box::new(move |s: RTCSignalingState| {
            let sink = signaling_sink.clone();
            Box::pin(async move {
                sink.emit(PeerEventKind::SignalingState(s.into()));
            })
        }));

        let ice_sink = events.clone();
        connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let sink = ice_sink.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                sink.emit(PeerEventKind::LocalCandidate(IceCandidateInit {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_mline_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                }));
            })
        }));

        let track_sink = events;
        connection.on_track(Box::new(move |track: Arc<TrackRemote>, _receiver, _transceiver| {
            let sink = track_sink.clone();
            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => MediaKind::Audio,
                    _ => MediaKind::Video,
                };
                let (packets, _) = broadcast::channel(PACKET_BUFFER);
                let remote = Arc::new(RtcRemoteTrack {
                    track_id: track.id(),
                    stream_id: track.stream_id(),
                    kind,
                    packets: packets.clone(),
                });
                info!(
                    generation = sink.generation(),
                    track = %remote.track_id,
                    stream = %remote.stream_id,
                    "Remote track arrived"
                );

                let track_id = remote.track_id.clone();
                sink.emit(PeerEventKind::RemoteTrack(remote));

                tokio::spawn(async move {
                    while let Ok((packet, _)) = track.read_rtp().await {
                        let _ = packets.send(packet);
                    }
                    debug!(track = %track_id, "Remote track ended");
                    sink.emit(PeerEventKind::RemoteTrackEnded { track_id });
                });
            })
        }));

        Ok(Self {
            generation,
            connection,
            senders: DashMap::new(),
            next_sender: AtomicU64::new(1),
        })
    }

    fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, PeerError> {
        let rtc = match desc.kind {
            SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
        };
        Ok(rtc)
    }
}

#[async_trait]
impl PeerConnection for RtcPeer {
    fn signaling_state(&self) -> SignalingState {
        self.connection.signaling_state().into()
    }

    fn connection_state(&self) -> ConnectionState {
        self.connection.connection_state().into()
    }

    async fn create_offer(&self) -> Result<SessionDescription, PeerError> {
        let offer = self.connection.create_offer(None).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, PeerError> {
        let answer = self.connection.create_answer(None).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), PeerError> {
        self.connection
            .set_local_description(Self::to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), PeerError> {
        self.connection
            .set_remote_description(Self::to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<(), PeerError> {
        self.connection
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: candidate.sdp_mid,
                sdp_mline_index: candidate.sdp_mline_index,
                username_fragment: candidate.username_fragment,
            })
            .await?;
        Ok(())
    }

    async fn add_track(&self, track: &LocalTrack) -> Result<SenderId, PeerError> {
        let sender = self.connection.add_track(track.rtc_track()).await?;
        let id = SenderId(self.next_sender.fetch_add(1, Ordering::Relaxed));

        // RTCP has to be drained for interceptors to work.
        let rtcp_sender = sender.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while rtcp_sender.read(&mut buf).await.is_ok() {}
        });

        self.senders.insert(id, sender);
        debug!(generation = self.generation, track = track.id(), "Attached local track");
        Ok(id)
    }

    async fn remove_track(&self, sender: SenderId) -> Result<(), PeerError> {
        let Some((_, rtp_sender)) = self.senders.remove(&sender) else {
            return Err(PeerError::UnknownSender(sender.0));
        };
        self.connection.remove_track(&rtp_sender).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), PeerError> {
        self.senders.clear();
        if let Err(e) = self.connection.close().await {
            warn!(generation = self.generation, "Error closing peer connection: {}", e);
            return Err(e.into());
        }
        Ok(())
    }
}
