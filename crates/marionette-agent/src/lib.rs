pub mod engine;
pub mod selector;
pub mod stub;

pub use engine::{AgentEngine, SpeechRecognizer, SpeechSynthesizer, SynthesizedSpeech};
pub use selector::select_best;
