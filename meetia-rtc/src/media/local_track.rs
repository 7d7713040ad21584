use crate::error::MediaError;
use bytes::Bytes;
use meetia_core::{MediaKind, TrackKind};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Live,
    /// Stopped by this client.
    Stopped,
    /// Ended by the capture source, e.g. the OS "stop sharing" button.
    Ended,
}

struct LocalTrackInner {
    id: String,
    stream_id: String,
    kind: TrackKind,
    enabled: AtomicBool,
    state: watch::Sender<TrackState>,
    rtc: Arc<TrackLocalStaticSample>,
}

/// A locally captured track. Clones share state.
///
/// The application feeds encoded samples with [`LocalTrack::write_sample`].
#[derive(Clone)]
pub struct LocalTrack {
    inner: Arc<LocalTrackInner>,
}

impl LocalTrack {
    pub fn new(kind: TrackKind, stream_id: impl Into<String>) -> Self {
        let stream_id = stream_id.into();
        let id = format!("{}-{}", kind, Uuid::new_v4());

        let capability = match kind.media_kind() {
            MediaKind::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            MediaKind::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
        };
        let rtc = Arc::new(TrackLocalStaticSample::new(
            capability,
            id.clone(),
            stream_id.clone(),
        ));
        let (state, _) = watch::channel(TrackState::Live);

        Self {
            inner: Arc::new(LocalTrackInner {
                id,
                stream_id,
                kind,
                enabled: AtomicBool::new(true),
                state,
                rtc,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn stream_id(&self) -> &str {
        &self.inner.stream_id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    /// Local mute. The track stays attached and keeps its sender.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Release);
    }

    pub fn state(&self) -> TrackState {
        *self.inner.state.borrow()
    }

    pub fn is_live(&self) -> bool {
        self.state() == TrackState::Live
    }

    /// Returns false if the track was already stopped or ended.
    pub fn stop(&self) -> bool {
        self.finish(TrackState::Stopped)
    }

    /// Marks the track as ended by its source.
    pub fn end(&self) -> bool {
        self.finish(TrackState::Ended)
    }

    fn finish(&self, next: TrackState) -> bool {
        self.inner.state.send_if_modified(|state| {
            if *state != TrackState::Live {
                return false;
            }
            *state = next;
            true
        })
    }

    /// Resolves once the track leaves `Live`, with the state it left to.
    pub async fn finished(&self) -> TrackState {
        let mut rx = self.inner.state.subscribe();
        rx.wait_for(|state| *state != TrackState::Live)
            .await
            .map(|state| *state)
            .unwrap_or(TrackState::Stopped)
    }

    pub fn rtc_track(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        self.inner.rtc.clone()
    }

    /// Writes one encoded sample. Samples written while the track is
    /// disabled are dropped.
    pub async fn write_sample(&self, data: Bytes, duration: Duration) -> Result<(), MediaError> {
        if !self.is_live() {
            return Err(MediaError::TrackStopped(self.inner.id.clone()));
        }
        if !self.is_enabled() {
            return Ok(());
        }

        let sample = Sample {
            data,
            duration,
            ..Default::default()
        };
        self.inner.rtc.write_sample(&sample).await?;
        Ok(())
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.inner.id)
            .field("stream_id", &self.inner.stream_id)
            .field("kind", &self.inner.kind)
            .field("enabled", &self.is_enabled())
            .field("state", &self.state())
            .finish()
    }
}
