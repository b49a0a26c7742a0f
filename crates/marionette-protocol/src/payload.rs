use serde::{Deserialize, Serialize};

/// One motion to play: a named group plus an index into that group.
///
/// Carried both as a standalone `motion-command` frame and inside
/// [`Actions`] on speech frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionSpec {
    pub group: String,
    pub index: u32,
    #[serde(rename = "loop", default)]
    pub looped: bool,
    #[serde(default)]
    pub priority: i32,
}

/// Animation instructions attached to a speech frame.
///
/// Every expression id must be a value of the active model's emotion map;
/// the adapter validates this before a frame is emitted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Actions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expressions: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub motions: Vec<MotionSpec>,
}

impl Actions {
    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty() && self.motions.is_empty()
    }

    pub fn with_expressions(expressions: Vec<u32>) -> Self {
        Self {
            expressions,
            motions: Vec::new(),
        }
    }
}

/// Text shown in the renderer's subtitle/chat area alongside speech.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayText {
    pub text: String,
    pub name: String,
    #[serde(default)]
    pub avatar: String,
}

/// Outbound speech frame.
///
/// `audio` is base64-encoded synthesized speech, or `null` for
/// expression-only frames (the renderer applies `actions` without lip-sync).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioPayload {
    pub audio: Option<String>,
    pub format: String,
    #[serde(default)]
    pub volumes: Vec<f32>,
    #[serde(default)]
    pub slice_length: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_text: Option<DisplayText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Actions>,
    #[serde(default)]
    pub forwarded: bool,
}

impl AudioPayload {
    /// Frame that carries animation instructions but no audio.
    pub fn expression_only(actions: Actions) -> Self {
        Self {
            audio: None,
            format: "wav".to_string(),
            volumes: Vec::new(),
            slice_length: 0,
            display_text: None,
            actions: Some(actions),
            forwarded: false,
        }
    }
}
