use marionette_core::types::BackendMode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::payload::{AudioPayload, MotionSpec};

/// Client → Server command frame.
/// Wire: `{ "type": "expression-command", "expression_id": 3, ... }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientFrame {
    ExpressionCommand {
        expression_id: i64,
        #[serde(default)]
        duration_ms: u64,
        #[serde(default)]
        priority: i32,
    },
    MotionCommand {
        motion_group: String,
        motion_index: u32,
        #[serde(rename = "loop", default)]
        looped: bool,
        #[serde(default)]
        priority: i32,
    },
    TextInput {
        text: String,
    },
    TextGenerationRequest {
        prompt: String,
        #[serde(default)]
        context: Value,
    },
    SetBackendMode {
        mode: BackendMode,
    },
    GetBackendMode,
    MicAudioData {
        audio: Vec<f32>,
    },
    MicAudioEnd,
}

/// Synchronous command outcome mirrored into ack frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Success,
    Error,
}

/// Server → Client frame. One tagged JSON object per message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerFrame {
    Audio(AudioPayload),
    MotionCommand(MotionSpec),
    ExpressionAck {
        status: AckStatus,
        expression_id: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    MotionAck {
        status: AckStatus,
        motion_group: String,
        motion_index: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    BackendModeSet {
        status: AckStatus,
        mode: BackendMode,
    },
    TextGenerationChunk {
        text: String,
    },
    TextGenerationResponse {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    UserInputTranscription {
        text: String,
    },
    AutonomousChat {
        text: String,
        character: String,
    },
    FullText {
        text: String,
    },
    PartialText {
        text: String,
    },
    Error {
        message: String,
    },
}

impl ServerFrame {
    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            message: message.into(),
        }
    }

    pub fn expression_ack_ok(expression_id: i64) -> Self {
        ServerFrame::ExpressionAck {
            status: AckStatus::Success,
            expression_id,
            error: None,
        }
    }

    pub fn expression_ack_err(expression_id: i64, error: impl Into<String>) -> Self {
        ServerFrame::ExpressionAck {
            status: AckStatus::Error,
            expression_id,
            error: Some(error.into()),
        }
    }

    pub fn motion_ack_ok(motion_group: &str, motion_index: u32) -> Self {
        ServerFrame::MotionAck {
            status: AckStatus::Success,
            motion_group: motion_group.to_string(),
            motion_index,
            error: None,
        }
    }

    pub fn motion_ack_err(motion_group: &str, motion_index: u32, error: impl Into<String>) -> Self {
        ServerFrame::MotionAck {
            status: AckStatus::Error,
            motion_group: motion_group.to_string(),
            motion_index,
            error: Some(error.into()),
        }
    }

    /// Frame tag as it appears on the wire, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerFrame::Audio(_) => "audio",
            ServerFrame::MotionCommand(_) => "motion-command",
            ServerFrame::ExpressionAck { .. } => "expression-ack",
            ServerFrame::MotionAck { .. } => "motion-ack",
            ServerFrame::BackendModeSet { .. } => "backend-mode-set",
            ServerFrame::TextGenerationChunk { .. } => "text-generation-chunk",
            ServerFrame::TextGenerationResponse { .. } => "text-generation-response",
            ServerFrame::UserInputTranscription { .. } => "user-input-transcription",
            ServerFrame::AutonomousChat { .. } => "autonomous-chat",
            ServerFrame::FullText { .. } => "full-text",
            ServerFrame::PartialText { .. } => "partial-text",
            ServerFrame::Error { .. } => "error",
        }
    }
}
