//! Trait seams for the external collaborators the control plane drives:
//! the text-generation agent, the TTS engine, and the speech recognizer.
//!
//! All three are treated as thread-safe services; implementations that are
//! not must serialize internally.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use marionette_core::Result;
use serde_json::Value;

/// The LLM "agent" that produces character text.
#[async_trait]
pub trait AgentEngine: Send + Sync {
    /// Generate a complete response for `prompt`.
    ///
    /// `context` is an opaque JSON object forwarded from the caller
    /// (conversation hints, platform metadata); engines may ignore it.
    async fn generate(&self, prompt: &str, context: &Value) -> Result<String>;

    /// Stream a response chunk by chunk.
    ///
    /// The default implementation yields the whole response as one chunk;
    /// engines with native streaming should override it.
    fn generate_stream<'a>(
        &'a self,
        prompt: &'a str,
        context: &'a Value,
    ) -> BoxStream<'a, Result<String>> {
        Box::pin(async_stream::stream! {
            yield self.generate(prompt, context).await;
        })
    }

    /// Engine name for logging.
    fn engine_name(&self) -> &str;
}

/// Output of one TTS synthesis call.
#[derive(Debug, Clone)]
pub struct SynthesizedSpeech {
    pub audio: Vec<u8>,
    /// Container format of `audio` (e.g. "wav", "mp3").
    pub format: String,
    /// Per-slice volume samples driving mouth animation.
    pub volumes: Vec<f32>,
    /// Duration of one volume slice in milliseconds.
    pub slice_length: u64,
}

/// Text-to-speech engine.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedSpeech>;

    /// Engine name for logging.
    fn engine_name(&self) -> &str;
}

/// Speech recognizer consuming buffered microphone samples (f32 PCM).
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn transcribe(&self, samples: &[f32]) -> Result<String>;

    /// Engine name for logging.
    fn engine_name(&self) -> &str;
}
