use crate::tracks::RemoteTrack;
use meetia_core::{TrackKind, UserId};

#[derive(Debug, Clone, Default)]
pub struct TrackFilter {
    pub exclude_kinds: Vec<TrackKind>,
    pub exclude_participant: Option<UserId>,
}

impl TrackFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn without_kind(mut self, kind: TrackKind) -> Self {
        self.exclude_kinds.push(kind);
        self
    }

    pub fn without_participant(mut self, participant: UserId) -> Self {
        self.exclude_participant = Some(participant);
        self
    }

    pub fn matches(&self, track: &RemoteTrack) -> bool {
        !self.exclude_kinds.contains(&track.kind)
            && self.exclude_participant.as_ref() != Some(&track.participant)
    }
}

/// Inbound tracks keyed by track id, in arrival order.
#[derive(Debug, Default)]
pub struct RemoteTrackRegistry {
    tracks: Vec<RemoteTrack>,
}

impl RemoteTrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `track`, superseding an entry with the same id. Returns
    /// true if one was replaced.
    pub fn upsert(&mut self, track: RemoteTrack) -> bool {
        let before = self.tracks.len();
        self.tracks.retain(|t| t.track_id != track.track_id);
        let replaced = self.tracks.len() != before;
        self.tracks.push(track);
        replaced
    }

    pub fn remove(&mut self, track_id: &str) -> Option<RemoteTrack> {
        let idx = self.tracks.iter().position(|t| t.track_id == track_id)?;
        Some(self.tracks.remove(idx))
    }

    pub fn get(&self, track_id: &str) -> Option<&RemoteTrack> {
        self.tracks.iter().find(|t| t.track_id == track_id)
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn view(&self, filter: &TrackFilter) -> Vec<RemoteTrack> {
        self.tracks
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect()
    }

    /// Distinct owners, in order of first appearance.
    pub fn participants(&self) -> Vec<UserId> {
        let mut seen: Vec<UserId> = Vec::new();
        for track in &self.tracks {
            if !seen.contains(&track.participant) {
                seen.push(track.participant.clone());
            }
        }
        seen
    }
}
