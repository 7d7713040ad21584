use crate::error::{PeerError, SessionError};
use crate::media::{LocalStream, MediaConstraints, MediaDevices, TrackState};
use crate::peer::{PeerManager, SenderId};
use meetia_core::{StreamInfo, TrackKind, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum MediaEvent {
    /// The capture source ended the screen track on its own.
    ScreenTrackEnded { stream_id: String },
}

#[derive(Debug, Clone, Copy)]
struct AttachedSender {
    kind: TrackKind,
    generation: u64,
    sender: SenderId,
}

type Senders = HashMap<String, AttachedSender>;

/// Owns the camera/microphone and screen streams of a session and keeps
/// their tracks attached to the current peer connection.
pub struct LocalMedia {
    owner: UserId,
    devices: Arc<dyn MediaDevices>,
    events: mpsc::UnboundedSender<MediaEvent>,
    camera: Option<LocalStream>,
    screen: Option<LocalStream>,
    screen_watch: Option<JoinHandle<()>>,
    senders: Senders,
    muted: bool,
    video_enabled: bool,
}

impl LocalMedia {
    pub fn new(
        owner: UserId,
        devices: Arc<dyn MediaDevices>,
        events: mpsc::UnboundedSender<MediaEvent>,
    ) -> Self {
        Self {
            owner,
            devices,
            events,
            camera: None,
            screen: None,
            screen_watch: None,
            senders: HashMap::new(),
            muted: false,
            video_enabled: true,
        }
    }

    pub fn camera(&self) -> Option<&LocalStream> {
        self.camera.as_ref()
    }

    pub fn screen(&self) -> Option<&LocalStream> {
        self.screen.as_ref()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_video_enabled(&self) -> bool {
        self.video_enabled
    }

    pub fn is_screen_sharing(&self) -> bool {
        self.screen.is_some()
    }

    /// Ownership of every stream currently offered to the remote side.
    pub fn announcements(&self) -> Vec<StreamInfo> {
        self.camera
            .iter()
            .chain(self.screen.iter())
            .map(LocalStream::info)
            .collect()
    }

    /// Captures camera and/or microphone, replacing the previous camera
    /// stream, and attaches the tracks when a connection exists. The caller
    /// renegotiates.
    pub async fn start_local_stream(
        &mut self,
        peer: &PeerManager,
        constraints: MediaConstraints,
    ) -> Result<LocalStream, SessionError> {
        let stream = self.devices.user_media(&self.owner, constraints).await?;

        if let Some(previous) = self.camera.take() {
            debug!(stream = previous.id(), "Replacing camera stream");
            Self::release(&mut self.senders, peer, &previous).await;
        }

        if let Err(e) = Self::attach_stream(&mut self.senders, peer, &stream).await {
            Self::release(&mut self.senders, peer, &stream).await;
            return Err(e.into());
        }

        self.muted = !constraints.audio;
        self.video_enabled = constraints.video;
        self.camera = Some(stream.clone());
        info!(stream = stream.id(), ?constraints, "Local stream started");
        Ok(stream)
    }

    /// Flips the microphone. Returns the new enabled flag, or `None`
    /// without an audio track.
    pub fn toggle_audio(&mut self) -> Option<bool> {
        let enabled = Self::toggle(self.camera.as_ref()?, TrackKind::Audio)?;
        self.muted = !enabled;
        Some(enabled)
    }

    pub fn toggle_video(&mut self) -> Option<bool> {
        let enabled = Self::toggle(self.camera.as_ref()?, TrackKind::Video)?;
        self.video_enabled = enabled;
        Some(enabled)
    }

    fn toggle(stream: &LocalStream, kind: TrackKind) -> Option<bool> {
        let enabled = !stream.tracks_of(kind).next()?.is_enabled();
        for track in stream.tracks_of(kind) {
            track.set_enabled(enabled);
        }
        Some(enabled)
    }

    pub async fn start_screen_share(
        &mut self,
        peer: &PeerManager,
    ) -> Result<LocalStream, SessionError> {
        let stream = self.devices.display_media(&self.owner).await?;

        if let Some(previous) = self.screen.take() {
            self.stop_watch();
            Self::release(&mut self.senders, peer, &previous).await;
        }

        if let Err(e) = Self::attach_stream(&mut self.senders, peer, &stream).await {
            Self::release(&mut self.senders, peer, &stream).await;
            return Err(e.into());
        }

        self.watch_screen(&stream);
        self.screen = Some(stream.clone());
        info!(stream = stream.id(), "Screen share started");
        Ok(stream)
    }

    /// Stops the screen tracks and removes their senders. Returns false if
    /// nothing was being shared.
    pub async fn stop_screen_share(&mut self, peer: &PeerManager) -> bool {
        let Some(stream) = self.screen.take() else {
            return false;
        };
        self.stop_watch();
        Self::release(&mut self.senders, peer, &stream).await;
        info!(stream = stream.id(), "Screen share stopped");
        true
    }

    /// Attaches every live track to a freshly created connection. Senders of
    /// the previous instance are forgotten.
    pub async fn reattach(&mut self, peer: &PeerManager) -> Result<usize, PeerError> {
        self.senders.clear();
        let mut attached = 0;
        for stream in self.camera.iter().chain(self.screen.iter()) {
            attached += Self::attach_stream(&mut self.senders, peer, stream).await?;
        }
        Ok(attached)
    }

    /// Stops every local track. Returns how many were still live, so a
    /// second call returns 0.
    pub fn release_all(&mut self) -> usize {
        self.stop_watch();
        self.senders.clear();
        self.camera
            .take()
            .into_iter()
            .chain(self.screen.take())
            .map(|stream| stream.stop_all())
            .sum()
    }

    fn watch_screen(&mut self, stream: &LocalStream) {
        let Some(track) = stream.tracks_of(TrackKind::Screen).next().cloned() else {
            return;
        };
        let events = self.events.clone();
        let stream_id = stream.id().to_string();

        self.screen_watch = Some(tokio::spawn(async move {
            if track.finished().await == TrackState::Ended {
                let _ = events.send(MediaEvent::ScreenTrackEnded { stream_id });
            }
        }));
    }

    fn stop_watch(&mut self) {
        if let Some(watch) = self.screen_watch.take() {
            watch.abort();
        }
    }

    async fn attach_stream(
        senders: &mut Senders,
        peer: &PeerManager,
        stream: &LocalStream,
    ) -> Result<usize, PeerError> {
        if !peer.has_connection() {
            return Ok(0);
        }

        let mut attached = 0;
        for track in stream.tracks().iter().filter(|t| t.is_live()) {
            let sender = peer.attach(track).await?;
            senders.insert(
                track.id().to_string(),
                AttachedSender {
                    kind: track.kind(),
                    generation: peer.generation(),
                    sender,
                },
            );
            attached += 1;
        }
        Ok(attached)
    }

    async fn release(senders: &mut Senders, peer: &PeerManager, stream: &LocalStream) {
        for track in stream.tracks() {
            let Some(attached) = senders.remove(track.id()) else {
                continue;
            };
            if !peer.is_current(attached.generation) {
                continue;
            }
            if let Err(e) = peer.detach(attached.sender).await {
                warn!(track = track.id(), "Failed to remove sender: {}", e);
            }
        }
        stream.stop_all();
    }
}

impl Drop for LocalMedia {
    fn drop(&mut self) {
        self.release_all();
    }
}
