mod ice;
mod identity;
mod media;
mod signaling;

pub use ice::{DEFAULT_STUN_SERVERS, IceServerConfig, default_ice_servers};
pub use identity::{MeetingId, UserId};
pub use media::{MediaKind, StreamSource, TrackKind};
pub use signaling::{IceCandidateInit, SignalKind, SignalMessage, StreamInfo};
