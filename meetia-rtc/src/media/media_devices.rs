use crate::error::MediaAccessError;
use crate::media::LocalTrack;
use async_trait::async_trait;
use meetia_core::{StreamInfo, StreamSource, TrackKind, UserId};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
        }
    }
}

/// Result of one capture request.
#[derive(Debug, Clone)]
pub struct LocalStream {
    id: String,
    owner: UserId,
    source: StreamSource,
    tracks: Vec<LocalTrack>,
}

impl LocalStream {
    /// Creates a stream with one live track per kind. The id embeds owner
    /// and source so receivers without announcements can still classify it.
    pub fn new(owner: &UserId, source: StreamSource, kinds: &[TrackKind]) -> Self {
        let id = format!("{}-{}-{}", owner, source.marker(), Uuid::new_v4());
        let tracks = kinds
            .iter()
            .map(|kind| LocalTrack::new(*kind, id.clone()))
            .collect();

        Self {
            id,
            owner: owner.clone(),
            source,
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> StreamSource {
        self.source
    }

    pub fn tracks(&self) -> &[LocalTrack] {
        &self.tracks
    }

    pub fn tracks_of(&self, kind: TrackKind) -> impl Iterator<Item = &LocalTrack> {
        self.tracks.iter().filter(move |t| t.kind() == kind)
    }

    /// Stops every live track. Returns how many were still live.
    pub fn stop_all(&self) -> usize {
        self.tracks.iter().filter(|t| t.stop()).count()
    }

    pub fn info(&self) -> StreamInfo {
        StreamInfo {
            stream_id: self.id.clone(),
            user_id: self.owner.clone(),
            source: self.source,
        }
    }
}

/// Capture backend.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn user_media(
        &self,
        owner: &UserId,
        constraints: MediaConstraints,
    ) -> Result<LocalStream, MediaAccessError>;

    async fn display_media(&self, owner: &UserId) -> Result<LocalStream, MediaAccessError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceAccess {
    #[default]
    Granted,
    Denied,
    Unavailable,
}

impl DeviceAccess {
    fn check(self, device: &str) -> Result<(), MediaAccessError> {
        match self {
            DeviceAccess::Granted => Ok(()),
            DeviceAccess::Denied => Err(MediaAccessError::PermissionDenied(device.to_string())),
            DeviceAccess::Unavailable => Err(MediaAccessError::DeviceUnavailable(device.to_string())),
        }
    }
}

/// Devices whose tracks are fed by the application through
/// [`LocalTrack::write_sample`].
#[derive(Debug, Clone, Default)]
pub struct SampleDevices {
    camera: DeviceAccess,
    microphone: DeviceAccess,
    screen: DeviceAccess,
}

impl SampleDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_camera(mut self, access: DeviceAccess) -> Self {
        self.camera = access;
        self
    }

    pub fn with_microphone(mut self, access: DeviceAccess) -> Self {
        self.microphone = access;
        self
    }

    pub fn with_screen(mut self, access: DeviceAccess) -> Self {
        self.screen = access;
        self
    }
}

#[async_trait]
impl MediaDevices for SampleDevices {
    async fn user_media(
        &self,
        owner: &UserId,
        constraints: MediaConstraints,
    ) -> Result<LocalStream, MediaAccessError> {
        let mut kinds = Vec::new();
        if constraints.video {
            self.camera.check("camera")?;
            kinds.push(TrackKind::Video);
        }
        if constraints.audio {
            self.microphone.check("microphone")?;
            kinds.push(TrackKind::Audio);
        }
        if kinds.is_empty() {
            return Err(MediaAccessError::NothingRequested);
        }

        Ok(LocalStream::new(owner, StreamSource::Camera, &kinds))
    }

    async fn display_media(&self, owner: &UserId) -> Result<LocalStream, MediaAccessError> {
        self.screen.check("screen")?;
        Ok(LocalStream::new(owner, StreamSource::Screen, &[TrackKind::Screen]))
    }
}
