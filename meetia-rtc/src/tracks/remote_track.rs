use meetia_core::{MediaKind, TrackKind, UserId};
use std::fmt;
use std::sync::Arc;

/// Live handle to an inbound media track.
pub trait RemoteMedia: Send + Sync + fmt::Debug {
    fn track_id(&self) -> &str;

    fn stream_id(&self) -> &str;

    fn kind(&self) -> MediaKind;
}

/// A classified inbound track as the presentation layer sees it.
#[derive(Debug, Clone)]
pub struct RemoteTrack {
    pub participant: UserId,
    pub kind: TrackKind,
    pub track_id: String,
    pub stream: Arc<dyn RemoteMedia>,
}

impl RemoteTrack {
    pub fn stream_id(&self) -> &str {
        self.stream.stream_id()
    }
}
