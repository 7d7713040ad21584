use crate::error::SessionError;
use crate::media::{LocalStream, MediaConstraints};
use tokio::sync::oneshot;

/// Commands from the presentation layer to the session loop.
#[derive(Debug)]
pub enum SessionCommand {
    /// Capture camera/microphone, attach and renegotiate.
    StartLocalStream {
        constraints: MediaConstraints,
        reply: oneshot::Sender<Result<LocalStream, SessionError>>,
    },

    /// Local mute. Replies with the new enabled flag.
    ToggleAudio { reply: oneshot::Sender<Option<bool>> },

    ToggleVideo { reply: oneshot::Sender<Option<bool>> },

    StartScreenShare {
        reply: oneshot::Sender<Result<LocalStream, SessionError>>,
    },

    /// Replies false if nothing was shared.
    StopScreenShare { reply: oneshot::Sender<bool> },

    /// Manual recovery after a fatal connection failure.
    Rejoin {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Leave the meeting.
    Disconnect { reply: oneshot::Sender<()> },
}
