pub mod config;
pub mod error;
pub mod media;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod tracks;
pub mod transport;

pub use config::{ReconnectPolicy, SessionConfig};
pub use error::{
    ConfigError, MediaAccessError, MediaError, PeerError, SessionError, TransportError,
};
pub use media::{
    DeviceAccess, LocalMedia, LocalStream, LocalTrack, MediaConstraints, MediaDevices, MediaEvent,
    SampleDevices, TrackState,
};
pub use peer::{
    AnswerOutcome, ConnectionState, IceConnectionState, PeerConnection, PeerConnector, PeerEvent,
    PeerEventKind, PeerEventSink, PeerManager, PeerPhase, ReinitReason, RtcPeer, RtcPeerConnector,
    RtcRemoteTrack, SdpKind, SenderId, SessionDescription, SignalingState,
};
pub use session::{Session, SessionCommand, SessionHandle, SessionSnapshot, join};
pub use signaling::PendingSignalQueue;
pub use tracks::{
    RemoteMedia, RemoteTrack, RemoteTrackRegistry, StreamDirectory, TrackFilter, classify,
    parse_stream_id,
};
pub use transport::{
    ConnectionHandle, SignalTransport, TransportEvent, TransportHandle, TransportState,
};
