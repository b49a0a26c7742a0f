use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("External service failure ({service}): {reason}")]
    ExternalService { service: String, reason: String },

    #[error("Outbound channel full, frame dropped")]
    Backpressure,

    #[error("Session closed: {id}")]
    SessionClosed { id: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request timeout after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ControlError {
    /// Short error code string surfaced to clients in acks and error frames.
    pub fn code(&self) -> &'static str {
        match self {
            ControlError::Config(_) => "CONFIG_ERROR",
            ControlError::Validation(_) => "VALIDATION_ERROR",
            ControlError::NotFound { .. } => "NOT_FOUND",
            ControlError::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            ControlError::Backpressure => "BACKPRESSURE_DROPPED",
            ControlError::SessionClosed { .. } => "SESSION_CLOSED",
            ControlError::Serialization(_) => "SERIALIZATION_ERROR",
            ControlError::Io(_) => "IO_ERROR",
            ControlError::Timeout { .. } => "TIMEOUT",
            ControlError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convenience constructor for collaborator failures (agent, TTS, ASR).
    pub fn external(service: &str, reason: impl ToString) -> Self {
        ControlError::ExternalService {
            service: service.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Convenience constructor for missing expressions / motion groups / sessions.
    pub fn not_found(what: impl ToString) -> Self {
        ControlError::NotFound {
            what: what.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ControlError>;
