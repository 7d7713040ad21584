use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported url scheme {0}")]
    UnsupportedScheme(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to encode signal: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("connection {0} is closed")]
    ConnectionClosed(u64),
}

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("webrtc: {0}")]
    Rtc(#[from] webrtc::Error),

    #[error("no peer connection")]
    NoConnection,

    #[error("operation not valid in signaling state {0}")]
    InvalidState(String),

    #[error("signal message has no {0}")]
    MissingField(&'static str),

    #[error("unknown sender {0}")]
    UnknownSender(u64),
}

/// Capture could not be started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaAccessError {
    #[error("permission to capture {0} was denied")]
    PermissionDenied(String),

    #[error("no {0} device available")]
    DeviceUnavailable(String),

    #[error("neither audio nor video was requested")]
    NothingRequested,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("track {0} is stopped")]
    TrackStopped(String),

    #[error("webrtc: {0}")]
    Rtc(#[from] webrtc::Error),
}

/// Errors returned to callers of a session handle.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    MediaAccess(#[from] MediaAccessError),

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("session is closed")]
    Closed,
}
