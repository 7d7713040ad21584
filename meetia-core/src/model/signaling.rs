use crate::model::identity::{MeetingId, UserId};
use crate::model::media::StreamSource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

/// Trickle ICE candidate in the shape browsers produce with `toJSON()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateInit {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_mline_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

/// Announces who owns an outgoing stream, carried alongside an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub stream_id: String,
    pub user_id: UserId,
    pub source: StreamSource,
}

/// Control message exchanged with the signaling relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalMessage {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<IceCandidateInit>,
    pub user_id: UserId,
    pub meeting_id: MeetingId,
    /// Addressed participant. `None` means the relay decides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<UserId>,
    /// Set by the relay on offers it forwards for a new upstream track.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub streams: Vec<StreamInfo>,
}

impl SignalMessage {
    fn base(kind: SignalKind, user_id: UserId, meeting_id: MeetingId) -> Self {
        Self {
            kind,
            sdp: None,
            candidate: None,
            user_id,
            meeting_id,
            target: None,
            track_id: None,
            streams: Vec::new(),
        }
    }

    pub fn offer(user_id: UserId, meeting_id: MeetingId, sdp: String) -> Self {
        Self {
            sdp: Some(sdp),
            ..Self::base(SignalKind::Offer, user_id, meeting_id)
        }
    }

    pub fn answer(
        user_id: UserId,
        meeting_id: MeetingId,
        sdp: String,
        target: Option<UserId>,
    ) -> Self {
        Self {
            sdp: Some(sdp),
            target,
            ..Self::base(SignalKind::Answer, user_id, meeting_id)
        }
    }

    pub fn candidate(user_id: UserId, meeting_id: MeetingId, candidate: IceCandidateInit) -> Self {
        Self {
            candidate: Some(candidate),
            ..Self::base(SignalKind::Candidate, user_id, meeting_id)
        }
    }

    pub fn with_streams(mut self, streams: Vec<StreamInfo>) -> Self {
        self.streams = streams;
        self
    }

    /// True when the message has no target or targets `user`.
    pub fn is_addressed_to(&self, user: &UserId) -> bool {
        self.target.as_ref().is_none_or(|t| t == user)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
