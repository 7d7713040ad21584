use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a single media track as the transport sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

/// Kind of a track as the presentation layer sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
    Screen,
}

impl TrackKind {
    pub fn media_kind(self) -> MediaKind {
        match self {
            TrackKind::Audio => MediaKind::Audio,
            TrackKind::Video | TrackKind::Screen => MediaKind::Video,
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackKind::Audio => "audio",
            TrackKind::Video => "video",
            TrackKind::Screen => "screen",
        };
        f.write_str(name)
    }
}

/// Capture source a local stream comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSource {
    Camera,
    Screen,
}

impl StreamSource {
    /// Marker embedded in generated stream ids, e.g. `alice-camera-<uuid>`.
    pub fn marker(self) -> &'static str {
        match self {
            StreamSource::Camera => "camera",
            StreamSource::Screen => "screen",
        }
    }
}
