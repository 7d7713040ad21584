use crate::error::ConfigError;
use meetia_core::{IceServerConfig, MeetingId, UserId, default_ice_servers};
use std::time::Duration;
use url::Url;

/// How the signal transport retries after an unclean close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive failed attempts before giving up.
    pub max_attempts: u32,
    /// Fixed delay before each attempt.
    pub interval: Duration,
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt number `attempt` (1-based), or `None`
    /// once the budget is spent.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        (attempt >= 1 && attempt <= self.max_attempts).then_some(self.interval)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the meeting HTTP API, e.g. `http://localhost:8080`.
    pub api_url: Url,
    pub meeting_id: MeetingId,
    pub user_id: UserId,
    pub token: String,
    pub ice_servers: Vec<IceServerConfig>,
    pub reconnect: ReconnectPolicy,
    /// Backstop interval for draining the pending signal queue.
    pub flush_interval: Duration,
    /// Send a fresh offer after a screen share is stopped.
    pub renegotiate_on_screen_share_stop: bool,
}

impl SessionConfig {
    pub fn new(
        api_url: &str,
        meeting_id: impl Into<MeetingId>,
        user_id: impl Into<UserId>,
        token: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let api_url = Url::parse(api_url).map_err(|e| ConfigError::InvalidUrl {
            url: api_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            api_url,
            meeting_id: meeting_id.into(),
            user_id: user_id.into(),
            token: token.into(),
            ice_servers: default_ice_servers(),
            reconnect: ReconnectPolicy::default(),
            flush_interval: Duration::from_millis(500),
            renegotiate_on_screen_share_stop: true,
        })
    }

    pub fn with_ice_servers(mut self, ice_servers: Vec<IceServerConfig>) -> Self {
        self.ice_servers = ice_servers;
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// WebSocket endpoint of the signaling relay for this meeting.
    ///
    /// The token travels as a query parameter because browser WebSockets
    /// cannot carry an `Authorization` header.
    pub fn signal_url(&self) -> Result<Url, ConfigError> {
        let mut url = self.api_url.clone();
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|_| ConfigError::UnsupportedScheme(scheme.to_string()))?;

        url.path_segments_mut()
            .map_err(|_| ConfigError::InvalidUrl {
                url: self.api_url.to_string(),
                reason: "cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(["api", "rtc", "signal", self.meeting_id.as_str()]);

        url.query_pairs_mut()
            .clear()
            .append_pair("token", &self.token);

        Ok(url)
    }
}
