use axum::{
    routing::{get, post},
    Router,
};
use marionette_agent::stub::CannedAgent;
use marionette_agent::{AgentEngine, SpeechRecognizer, SpeechSynthesizer};
use marionette_chat::ChatPipeline;
use marionette_core::config::MarionetteConfig;
use marionette_core::types::{ChatMessage, SessionId};
use marionette_core::Result;
use marionette_model::LiveModelDescriptor;
use marionette_scheduler::{AutonomousPolicy, AutonomousScheduler};
use marionette_sessions::{EngineSet, SessionRegistry};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Depth of the queue between chat sources and the ingest pipeline.
const CHAT_INGEST_CAPACITY: usize = 256;

/// Collaborator engines plugged into the control plane at startup.
///
/// The gateway itself ships only development stubs; deployments provide
/// real implementations of the `marionette-agent` traits here.
pub struct Engines {
    pub agent: Arc<dyn AgentEngine>,
    pub tts: Option<Arc<dyn SpeechSynthesizer>>,
    pub asr: Option<Arc<dyn SpeechRecognizer>>,
}

impl Default for Engines {
    fn default() -> Self {
        Self {
            agent: Arc::new(CannedAgent::default()),
            tts: None,
            asr: None,
        }
    }
}

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: MarionetteConfig,
    pub registry: Arc<SessionRegistry>,
    pub policy: Arc<AutonomousPolicy>,
    pub pipeline: Arc<ChatPipeline>,
    /// Producer side of the chat ingest queue (REST chat injection).
    pub chat_tx: mpsc::Sender<ChatMessage>,
    pub presenter: SessionId,
}

impl AppState {
    /// Wire the full control plane and spawn its long-lived tasks
    /// (scheduler loop, ingest pipeline). Tasks stop when `cancel` fires.
    pub fn build(
        config: MarionetteConfig,
        engines: Engines,
        cancel: CancellationToken,
    ) -> Result<Arc<Self>> {
        let model = Arc::new(LiveModelDescriptor::from_config(&config.character));
        let registry = Arc::new(SessionRegistry::new(EngineSet {
            agent: engines.agent,
            tts: engines.tts,
            asr: engines.asr,
            model,
        }));

        let presenter = SessionId::from(config.chat.presenter_session.as_str());
        let policy = Arc::new(AutonomousPolicy::from_config(&config.autonomous)?);

        let pipeline = Arc::new(ChatPipeline::new(
            registry.clone(),
            presenter.clone(),
            config.character.name.clone(),
            config.chat.auto_responses_enabled,
        ));
        let (chat_tx, chat_rx) = mpsc::channel(CHAT_INGEST_CAPACITY);
        tokio::spawn(pipeline.clone().run(chat_rx, cancel.clone()));

        let scheduler =
            AutonomousScheduler::new(policy.clone(), registry.clone(), presenter.clone());
        tokio::spawn(scheduler.run(cancel));

        info!(character = %config.character.name, "control plane assembled");
        Ok(Arc::new(Self {
            config,
            registry,
            policy,
            pipeline,
            chat_tx,
            presenter,
        }))
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/client-ws", get(crate::ws::connection::ws_handler))
        .route("/api/expression", post(crate::http::animation::expression_handler))
        .route("/api/motion", post(crate::http::animation::motion_handler))
        .route(
            "/api/autonomous/speak",
            post(crate::http::autonomous::speak_handler),
        )
        .route(
            "/api/autonomous/generate",
            post(crate::http::autonomous::generate_handler),
        )
        .route(
            "/api/autonomous/control",
            post(crate::http::autonomous::control_handler),
        )
        .route(
            "/api/autonomous/status",
            get(crate::http::autonomous::status_handler),
        )
        .route("/api/chat", post(crate::http::chat::inject_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
}
