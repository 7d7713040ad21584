use crate::error::SessionError;
use crate::media::{LocalStream, MediaConstraints};
use crate::session::{SessionCommand, SessionSnapshot};
use tokio::sync::{mpsc, oneshot, watch};

/// Presentation-side handle to a running session. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<SessionCommand>,
        state: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self { commands, state }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn start_local_stream(
        &self,
        constraints: MediaConstraints,
    ) -> Result<LocalStream, SessionError> {
        self.request(|reply| SessionCommand::StartLocalStream { constraints, reply })
            .await?
    }

    pub async fn toggle_audio(&self) -> Result<Option<bool>, SessionError> {
        self.request(|reply| SessionCommand::ToggleAudio { reply })
            .await
    }

    pub async fn toggle_video(&self) -> Result<Option<bool>, SessionError> {
        self.request(|reply| SessionCommand::ToggleVideo { reply })
            .await
    }

    pub async fn start_screen_share(&self) -> Result<LocalStream, SessionError> {
        self.request(|reply| SessionCommand::StartScreenShare { reply })
            .await?
    }

    pub async fn stop_screen_share(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::StopScreenShare { reply })
            .await
    }

    pub async fn rejoin(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Rejoin { reply })
            .await?
    }

    /// Leaves the meeting. Calling it again, or after the session ended,
    /// is a no-op.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        match self
            .request(|reply| SessionCommand::Disconnect { reply })
            .await
        {
            Ok(()) | Err(SessionError::Closed) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    /// Waits until `predicate` holds for the published state.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot, SessionError> {
        let mut rx = self.state.clone();
        let snapshot = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(SessionSnapshot::clone(&snapshot))
    }
}
