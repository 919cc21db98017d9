use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection lifecycle of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Disconnected => "DISCONNECTED",
            SessionState::Connecting => "CONNECTING",
            SessionState::Connected => "CONNECTED",
        };
        f.write_str(label)
    }
}
