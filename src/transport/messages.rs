use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Session configuration sent once when the channel opens
#[derive(Debug, Serialize, Deserialize)]
pub struct VoiceConfigMessage {
    pub voice: String,
}

/// One captured audio frame
#[derive(Debug, Serialize, Deserialize)]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RealtimeInput {
    pub media: MediaChunk,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MediaChunk {
    pub data: String, // Base64-encoded 16-bit PCM
}

impl RealtimeInputMessage {
    pub fn new(data: String) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media: MediaChunk { data },
            },
        }
    }
}

/// Speaker of a transcript fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "model" => Some(Role::Model),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
        }
    }
}

/// A piece of a transcript belonging to the current turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptFragment {
    pub role: Role,
    pub text: String,
}

/// Message received from the remote peer
///
/// Every field is independent and optional. A field with an unexpected JSON
/// type is treated as absent rather than failing the whole envelope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundEnvelope {
    /// Base64-encoded 16-bit PCM at the output rate
    pub audio: Option<String>,
    /// Message type tag (`"transcription"`), absent on legacy text messages
    pub kind: Option<String>,
    pub role: Option<String>,
    pub text: Option<String>,
    pub turn_complete: bool,
    pub interrupted: bool,
}

impl InboundEnvelope {
    /// Parse an envelope; only non-JSON or non-object input is an error
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).context("Inbound message is not JSON")?;
        let object = value
            .as_object()
            .context("Inbound message is not a JSON object")?;

        let non_empty_str = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        let flag = |key: &str| object.get(key).and_then(Value::as_bool).unwrap_or(false);

        Ok(Self {
            audio: non_empty_str("audio"),
            kind: non_empty_str("type"),
            role: non_empty_str("role"),
            text: non_empty_str("text"),
            turn_complete: flag("turnComplete"),
            interrupted: flag("interrupted"),
        })
    }

    /// Transcript fragment carried by this envelope, if any
    ///
    /// `{type: "transcription", role, text}` carries either role. The legacy
    /// untyped `{text, role: "model"}` form only carries model text.
    pub fn transcript(&self) -> Option<TranscriptFragment> {
        let text = self.text.as_ref()?;
        let role = self.role.as_deref().and_then(Role::parse)?;

        match self.kind.as_deref() {
            Some("transcription") => Some(TranscriptFragment {
                role,
                text: text.clone(),
            }),
            None if role == Role::Model => Some(TranscriptFragment {
                role,
                text: text.clone(),
            }),
            _ => None,
        }
    }
}
