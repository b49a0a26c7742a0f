use marionette_agent::{AgentEngine, SpeechRecognizer, SpeechSynthesizer};
use marionette_core::types::{BackendMode, SessionId};
use marionette_model::LiveModelDescriptor;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::adapter::{self, BackendAdapter};
use crate::outbound::OutboundHandle;

/// External collaborators a session's adapters call into.
///
/// TTS and ASR are optional: a deployment without them still serves
/// expression/motion commands, and speech falls back to text-only frames.
#[derive(Clone)]
pub struct SessionContext {
    pub agent: Arc<dyn AgentEngine>,
    pub tts: Option<Arc<dyn SpeechSynthesizer>>,
    pub asr: Option<Arc<dyn SpeechRecognizer>>,
    pub model: Arc<LiveModelDescriptor>,
}

/// One connected renderer client.
///
/// Owns the outbound handle, the per-mode adapter cache, and the microphone
/// buffer. Never shared across clients; dropped on disconnect.
pub struct Session {
    id: SessionId,
    outbound: OutboundHandle,
    context: SessionContext,
    mode: RwLock<BackendMode>,
    adapters: Mutex<HashMap<BackendMode, Arc<dyn BackendAdapter>>>,
    /// Microphone samples accumulated between `mic-audio-data` frames.
    /// Taken atomically on `mic-audio-end`; late data opens the next utterance.
    mic_buffer: Mutex<Vec<f32>>,
    virtual_client: bool,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        outbound: OutboundHandle,
        context: SessionContext,
        virtual_client: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            outbound,
            context,
            mode: RwLock::new(BackendMode::Internal),
            adapters: Mutex::new(HashMap::new()),
            mic_buffer: Mutex::new(Vec::new()),
            virtual_client,
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn outbound(&self) -> &OutboundHandle {
        &self.outbound
    }

    /// REST-created sessions whose frames drain to a discard sink.
    pub fn is_virtual(&self) -> bool {
        self.virtual_client
    }

    pub fn mode(&self) -> BackendMode {
        *self.mode.read().unwrap()
    }

    /// Switch backend mode. Idempotent; the adapter for the new mode is
    /// created lazily on next use.
    pub fn set_mode(&self, mode: BackendMode) {
        *self.mode.write().unwrap() = mode;
    }

    /// Adapter for the session's current mode.
    pub fn adapter(&self) -> Arc<dyn BackendAdapter> {
        self.adapter_for(self.mode())
    }

    /// Adapter for a specific mode, created on first use and cached.
    pub fn adapter_for(&self, mode: BackendMode) -> Arc<dyn BackendAdapter> {
        let mut adapters = self.adapters.lock().unwrap();
        adapters
            .entry(mode)
            .or_insert_with(|| adapter::build(mode, self.outbound.clone(), self.context.clone()))
            .clone()
    }

    pub fn push_mic_audio(&self, samples: &[f32]) {
        self.mic_buffer.lock().unwrap().extend_from_slice(samples);
    }

    /// Take the buffered utterance, leaving an empty buffer for the next one.
    pub fn take_mic_audio(&self) -> Vec<f32> {
        std::mem::take(&mut *self.mic_buffer.lock().unwrap())
    }
}
