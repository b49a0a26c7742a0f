use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque per-renderer session identifier.
///
/// Random for stream-connected clients; REST callers may supply their own
/// (`client_uid`), in which case the string is used verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The session REST endpoints fall back to when no `client_uid` is given.
    pub fn default_client() -> Self {
        Self("default".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Which command origin a session's adapter normalizes.
///
/// Every session starts in `Internal`; clients switch at runtime with the
/// `set-backend-mode` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BackendMode {
    #[default]
    Internal,
    ExternalApi,
    Autonomous,
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackendMode::Internal => "internal",
            BackendMode::ExternalApi => "external-api",
            BackendMode::Autonomous => "autonomous",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for BackendMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "internal" => Ok(BackendMode::Internal),
            "external-api" | "external_api" => Ok(BackendMode::ExternalApi),
            "autonomous" => Ok(BackendMode::Autonomous),
            other => Err(format!("unknown backend mode: {other}")),
        }
    }
}

/// A message received from an external chat platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Logical platform name (e.g. "youtube", "twitch").
    pub platform: String,

    /// Platform-native identifier for the sender.
    pub user_id: String,

    /// Human-readable display name for the sender.
    pub username: String,

    /// Plain text content of the message.
    pub text: String,

    /// When the message was received.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(platform: &str, user_id: &str, username: &str, text: &str) -> Self {
        Self {
            platform: platform.to_string(),
            user_id: user_id.to_string(),
            username: username.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Verdict of the spam filter for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpamVerdict {
    pub is_spam: bool,
    pub reason: String,
}

impl SpamVerdict {
    pub fn clean() -> Self {
        Self {
            is_spam: false,
            reason: String::new(),
        }
    }

    pub fn spam(reason: &str) -> Self {
        Self {
            is_spam: true,
            reason: reason.to_string(),
        }
    }
}

/// Verdict of the quality scorer for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityVerdict {
    pub respond: bool,
    pub score: f64,
    pub reason: String,
}
