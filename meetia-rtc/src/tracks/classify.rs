use crate::tracks::{RemoteMedia, RemoteTrack};
use meetia_core::{MediaKind, StreamInfo, StreamSource, TrackKind, UserId};
use std::collections::HashMap;
use std::sync::Arc;

/// Stream ownership announced by remote participants on their offers.
#[derive(Debug, Default)]
pub struct StreamDirectory {
    streams: HashMap<String, StreamInfo>,
}

impl StreamDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, announced: &[StreamInfo]) {
        for info in announced {
            self.streams.insert(info.stream_id.clone(), info.clone());
        }
    }

    pub fn lookup(&self, stream_id: &str) -> Option<&StreamInfo> {
        self.streams.get(stream_id)
    }

    pub fn clear(&mut self) {
        self.streams.clear();
    }
}

/// Splits `<user>-camera-<suffix>` or `<user>-screen-<suffix>`.
///
/// Ids without a source marker are taken as the participant id itself.
pub fn parse_stream_id(stream_id: &str) -> (UserId, Option<StreamSource>) {
    for source in [StreamSource::Camera, StreamSource::Screen] {
        let marker = format!("-{}-", source.marker());
        if let Some(idx) = stream_id.find(&marker) {
            if idx > 0 {
                return (UserId::from(&stream_id[..idx]), Some(source));
            }
        }
    }
    (UserId::from(stream_id), None)
}

pub fn classify(media: Arc<dyn RemoteMedia>, directory: &StreamDirectory) -> RemoteTrack {
    let stream_id = media.stream_id();
    let (participant, source) = match directory.lookup(stream_id) {
        Some(info) => (info.user_id.clone(), Some(info.source)),
        None => parse_stream_id(stream_id),
    };

    let kind = match (media.kind(), source) {
        (MediaKind::Audio, _) => TrackKind::Audio,
        (MediaKind::Video, Some(StreamSource::Screen)) => TrackKind::Screen,
        (MediaKind::Video, Some(StreamSource::Camera)) => TrackKind::Video,
        (MediaKind::Video, None) if stream_id.contains("screen") => TrackKind::Screen,
        (MediaKind::Video, None) => TrackKind::Video,
    };

    RemoteTrack {
        participant,
        kind,
        track_id: media.track_id().to_string(),
        stream: media,
    }
}
