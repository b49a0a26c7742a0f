pub mod config;
pub mod error;
pub mod types;

pub use error::{ControlError, Result};
pub use types::{BackendMode, ChatMessage, QualityVerdict, SessionId, SpamVerdict};
