use async_trait::async_trait;
use marionette_core::types::ChatMessage;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors a chat source can report while connected to its platform.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The platform connection could not be established.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The platform closed the connection or the ingest channel went away.
    #[error("Source closed: {0}")]
    Closed(String),

    /// The source-specific configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Common interface implemented by every external chat platform binding
/// (YouTube live chat, Twitch IRC, webhook relays, …).
///
/// Implementations must be `Send + Sync` so the pipeline can drive several
/// sources from independent Tokio tasks.
#[async_trait]
pub trait ChatSource: Send + Sync {
    /// Stable lowercase identifier for this source (e.g. `"twitch"`).
    fn name(&self) -> &str;

    /// Connect to the platform and push every received message into `tx`
    /// until the connection ends. Returning `Ok` means a clean shutdown.
    async fn run(&self, tx: mpsc::Sender<ChatMessage>) -> Result<(), SourceError>;
}
