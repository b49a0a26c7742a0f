//! Development stand-ins used when no real engine is wired into the gateway.
//!
//! The control plane is deployed next to real LLM / TTS / ASR services that
//! implement the [`crate::engine`] traits; these stubs keep the gateway fully
//! drivable (and demo-able with plain `curl`) without them.

use async_trait::async_trait;
use marionette_core::{ControlError, Result};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::engine::{AgentEngine, SpeechRecognizer, SynthesizedSpeech};

/// Cycles through a fixed set of canned replies.
pub struct CannedAgent {
    lines: Vec<String>,
    cursor: AtomicUsize,
}

impl CannedAgent {
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl Default for CannedAgent {
    fn default() -> Self {
        Self::new(vec![
            "[joy] Thanks for the message, that made my day!".to_string(),
            "[neutral] Let me think about that for a second.".to_string(),
            "[surprise] Oh! I was not expecting that question.".to_string(),
        ])
    }
}

#[async_trait]
impl AgentEngine for CannedAgent {
    async fn generate(&self, _prompt: &str, _context: &Value) -> Result<String> {
        if self.lines.is_empty() {
            return Err(ControlError::external("agent", "no canned lines configured"));
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.lines.len();
        Ok(self.lines[i].clone())
    }

    fn engine_name(&self) -> &str {
        "canned"
    }
}

/// Recognizer that reports itself unconfigured on every call.
pub struct DisabledRecognizer;

#[async_trait]
impl SpeechRecognizer for DisabledRecognizer {
    async fn transcribe(&self, _samples: &[f32]) -> Result<String> {
        Err(ControlError::external("asr", "no speech recognizer configured"))
    }

    fn engine_name(&self) -> &str {
        "disabled"
    }
}

/// Synthesizer producing a silent clip sized to the text, useful for
/// exercising the audio path without a real voice model.
pub struct SilentSynthesizer;

#[async_trait]
impl crate::engine::SpeechSynthesizer for SilentSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedSpeech> {
        let slices = text.chars().count().max(1);
        Ok(SynthesizedSpeech {
            audio: vec![0u8; slices * 32],
            format: "wav".to_string(),
            volumes: vec![0.0; slices],
            slice_length: 20,
        })
    }

    fn engine_name(&self) -> &str {
        "silent"
    }
}
