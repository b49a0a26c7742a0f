use dashmap::DashMap;
use marionette_agent::{AgentEngine, SpeechRecognizer, SpeechSynthesizer};
use marionette_core::config::OUTBOUND_CAPACITY;
use marionette_core::types::{BackendMode, SessionId};
use marionette_model::LiveModelDescriptor;
use marionette_protocol::ServerFrame;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::outbound::OutboundHandle;
use crate::session::{Session, SessionContext};

/// Process-wide collaborators cloned into each new session's context.
#[derive(Clone)]
pub struct EngineSet {
    pub agent: Arc<dyn AgentEngine>,
    pub tts: Option<Arc<dyn SpeechSynthesizer>>,
    pub asr: Option<Arc<dyn SpeechRecognizer>>,
    pub model: Arc<LiveModelDescriptor>,
}

impl EngineSet {
    fn context(&self) -> SessionContext {
        SessionContext {
            agent: self.agent.clone(),
            tts: self.tts.clone(),
            asr: self.asr.clone(),
            model: self.model.clone(),
        }
    }
}

/// Process-wide map of live renderer sessions.
///
/// The registry is the sole mutator of the session map. Broadcast iteration
/// snapshots outbound handles before sending so no shard lock is held
/// across channel I/O.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
    engines: EngineSet,
}

impl SessionRegistry {
    pub fn new(engines: EngineSet) -> Self {
        Self {
            sessions: DashMap::new(),
            engines,
        }
    }

    /// Register a new stream-connected session under a fresh id.
    ///
    /// The caller owns the returned receiver and must drain it to the
    /// socket from a single writer task.
    pub fn connect(&self) -> (Arc<Session>, mpsc::Receiver<ServerFrame>) {
        self.connect_with_id(SessionId::new())
    }

    /// Register a stream-connected session under a caller-supplied id.
    /// An existing session with the same id is replaced (its producers
    /// observe a closed channel once the old receiver drops).
    pub fn connect_with_id(&self, id: SessionId) -> (Arc<Session>, mpsc::Receiver<ServerFrame>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let outbound = OutboundHandle::new(id.to_string(), tx);
        let session = Session::new(id.clone(), outbound, self.engines.context(), false);
        if self
            .sessions
            .insert(id.to_string(), session.clone())
            .is_some()
        {
            debug!(session = %id, "replaced existing session");
        }
        info!(session = %id, "session connected");
        (session, rx)
    }

    /// Remove a session. Its outbound receiver (held by the writer task)
    /// closes when that task ends; pending producers then observe
    /// closed-on-send and drop their frames.
    pub fn disconnect(&self, id: &SessionId) {
        if self.sessions.remove(id.as_str()).is_some() {
            info!(session = %id, "session disconnected");
        }
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.get(id.as_str()).map(|s| s.clone())
    }

    /// Resolve a session, lazily creating a *virtual* one (outbound drained
    /// to a discard task) when the id is unknown. REST endpoints that target
    /// a client that never connected land here.
    pub fn get_or_default(&self, id: &SessionId) -> Arc<Session> {
        self.sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                info!(session = %id, "creating virtual session");
                let (tx, mut rx) = mpsc::channel::<ServerFrame>(OUTBOUND_CAPACITY);
                let outbound = OutboundHandle::new(id.to_string(), tx);
                // Discard drain: keeps the channel flowing so producers
                // never block on a renderer that does not exist.
                tokio::spawn(async move { while rx.recv().await.is_some() {} });
                Session::new(id.clone(), outbound, self.engines.context(), true)
            })
            .clone()
    }

    /// Deliver `frame` to every session whose mode satisfies `predicate`.
    /// Best-effort: slow sessions drop the frame with a warning. Returns the
    /// number of sessions the frame was queued for.
    pub fn broadcast(&self, predicate: impl Fn(BackendMode) -> bool, frame: ServerFrame) -> usize {
        let targets: Vec<OutboundHandle> = self
            .sessions
            .iter()
            .filter(|entry| predicate(entry.value().mode()))
            .map(|entry| entry.value().outbound().clone())
            .collect();

        let mut delivered = 0;
        for outbound in targets {
            if outbound.try_send(frame.clone()) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Snapshot of sessions currently in `mode` (scheduler fan-out).
    pub fn sessions_in_mode(&self, mode: BackendMode) -> Vec<Arc<Session>> {
        self.sessions
            .iter()
            .filter(|entry| entry.value().mode() == mode)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
