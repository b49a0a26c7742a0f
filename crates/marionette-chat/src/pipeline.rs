//! Chat ingest pipeline: spam filter → quality gate → response selection →
//! animation dispatch on the presenter session.
//!
//! Every stage can drop the message; a drop is logged and nothing partial
//! is emitted.

use marionette_agent::select_best;
use marionette_core::types::{ChatMessage, SessionId};
use marionette_model::emotions;
use marionette_protocol::ServerFrame;
use marionette_sessions::{SessionRegistry, SpeakRequest};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::quality::QualityScorer;
use crate::source::ChatSource;
use crate::spam::SpamFilter;

pub struct ChatPipeline {
    spam: SpamFilter,
    quality: QualityScorer,
    registry: Arc<SessionRegistry>,
    presenter: SessionId,
    character_name: String,
    auto_responses: AtomicBool,
}

impl ChatPipeline {
    pub fn new(
        registry: Arc<SessionRegistry>,
        presenter: SessionId,
        character_name: String,
        auto_responses: bool,
    ) -> Self {
        Self {
            spam: SpamFilter::new(),
            quality: QualityScorer::new(),
            registry,
            presenter,
            character_name,
            auto_responses: AtomicBool::new(auto_responses),
        }
    }

    pub fn auto_responses_enabled(&self) -> bool {
        self.auto_responses.load(Ordering::Relaxed)
    }

    pub fn set_auto_responses(&self, enabled: bool) {
        self.auto_responses.store(enabled, Ordering::Relaxed);
    }

    /// Run one message through the full pipeline.
    pub async fn handle(&self, msg: ChatMessage) {
        let verdict = self.spam.check(&msg);
        if verdict.is_spam {
            debug!(
                platform = %msg.platform,
                user = %msg.user_id,
                reason = %verdict.reason,
                "chat message rejected as spam"
            );
            return;
        }

        let quality = self.quality.should_respond(&msg, &self.character_name);
        if !quality.respond {
            debug!(
                user = %msg.user_id,
                score = quality.score,
                reason = %quality.reason,
                "chat message below response threshold"
            );
            return;
        }

        if !self.auto_responses_enabled() {
            debug!(user = %msg.user_id, "auto-responses disabled, message scored but not answered");
            return;
        }

        let presenter = self.registry.get_or_default(&self.presenter);
        let context = serde_json::json!({
            "platform": msg.platform,
            "username": msg.username,
        });
        let reply = select_best(presenter.context().agent.as_ref(), &msg.text, &context).await;
        if reply.is_empty() {
            warn!(user = %msg.user_id, "no response candidate survived, message dropped");
            return;
        }

        let (expressions, display) =
            emotions::extract_and_strip(&reply, presenter.context().model.emotion_map());
        let display = display.trim().to_string();

        let result = presenter
            .adapter()
            .speak(SpeakRequest {
                text: Some(display.clone()),
                expressions,
                ..Default::default()
            })
            .await;
        if let Err(e) = result {
            warn!(user = %msg.user_id, error = %e, "chat response dispatch failed");
            return;
        }

        self.registry.broadcast(
            |_| true,
            ServerFrame::AutonomousChat {
                text: display,
                character: self.character_name.clone(),
            },
        );
    }

    /// Drain the ingest channel until it closes or `cancel` fires.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<ChatMessage>, cancel: CancellationToken) {
        info!("chat ingest pipeline started");
        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Some(msg) => self.handle(msg).await,
                        None => break,
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
        info!("chat ingest pipeline stopped");
    }

    /// Spawn a task driving `source` into the ingest channel.
    pub fn bind_source(source: Arc<dyn ChatSource>, tx: mpsc::Sender<ChatMessage>) {
        tokio::spawn(async move {
            let name = source.name().to_string();
            info!(source = %name, "chat source connected");
            if let Err(e) = source.run(tx).await {
                warn!(source = %name, error = %e, "chat source terminated");
            } else {
                info!(source = %name, "chat source closed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_agent::stub::CannedAgent;
    use marionette_agent::AgentEngine;
    use marionette_core::types::BackendMode;
    use marionette_model::LiveModelDescriptor;
    use marionette_sessions::EngineSet;
    use std::time::Duration;

    fn setup(agent: Arc<dyn AgentEngine>) -> (Arc<SessionRegistry>, Arc<ChatPipeline>) {
        let registry = Arc::new(SessionRegistry::new(EngineSet {
            agent,
            tts: None,
            asr: None,
            model: Arc::new(LiveModelDescriptor::from_config(&Default::default())),
        }));
        let pipeline = Arc::new(ChatPipeline::new(
            registry.clone(),
            SessionId::from("default"),
            "Mari".to_string(),
            true,
        ));
        (registry, pipeline)
    }

    async fn recv(
        rx: &mut mpsc::Receiver<ServerFrame>,
    ) -> ServerFrame {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn good_message_dispatches_speech_and_broadcast() {
        let agent = Arc::new(CannedAgent::new(vec![
            "[joy] Glad you asked, it is going great!".to_string(),
        ]));
        let (registry, pipeline) = setup(agent);
        let (_presenter, mut rx) = registry.connect_with_id(SessionId::from("default"));

        pipeline
            .handle(ChatMessage::new(
                "twitch",
                "alice",
                "alice",
                "Mari, how is the stream going?",
            ))
            .await;

        match recv(&mut rx).await {
            ServerFrame::Audio(payload) => {
                let display = payload.display_text.unwrap();
                assert_eq!(display.text, "Glad you asked, it is going great!");
                assert_eq!(payload.actions.unwrap().expressions, vec![3]);
            }
            other => panic!("expected audio frame, got {other:?}"),
        }
        match recv(&mut rx).await {
            ServerFrame::AutonomousChat { text, character } => {
                assert_eq!(text, "Glad you asked, it is going great!");
                assert_eq!(character, "Mari");
            }
            other => panic!("expected autonomous-chat frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn spam_is_dropped_before_scoring() {
        let agent = Arc::new(CannedAgent::default());
        let (registry, pipeline) = setup(agent);
        let (_presenter, mut rx) = registry.connect_with_id(SessionId::from("default"));

        pipeline
            .handle(ChatMessage::new(
                "twitch",
                "mallory",
                "mallory",
                "click here for free money",
            ))
            .await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn duplicate_burst_only_answers_once_per_cooldown() {
        let agent = Arc::new(CannedAgent::new(vec![
            "[neutral] Morning to you too!".to_string(),
        ]));
        let (registry, pipeline) = setup(agent);
        let (_presenter, mut rx) = registry.connect_with_id(SessionId::from("default"));

        // First GM answers (if it scores), later identical copies are
        // duplicates; regardless of scoring, at most one dispatch happens.
        for _ in 0..3 {
            pipeline
                .handle(ChatMessage::new("twitch", "bob", "bob", "GM everyone, how are you?"))
                .await;
        }

        let mut audio_frames = 0;
        while let Ok(frame) = rx.try_recv() {
            if matches!(frame, ServerFrame::Audio(_)) {
                audio_frames += 1;
            }
        }
        assert_eq!(audio_frames, 1);
    }

    #[tokio::test]
    async fn disabled_auto_responses_never_dispatch() {
        let agent = Arc::new(CannedAgent::default());
        let (registry, pipeline) = setup(agent);
        pipeline.set_auto_responses(false);
        let (_presenter, mut rx) = registry.connect_with_id(SessionId::from("default"));

        pipeline
            .handle(ChatMessage::new(
                "twitch",
                "alice",
                "alice",
                "Mari, are you ignoring chat today?",
            ))
            .await;

        assert!(rx.try_recv().is_err());
        assert!(!pipeline.auto_responses_enabled());
    }

    #[tokio::test]
    async fn bound_source_flows_through_the_pipeline() {
        use crate::source::{ChatSource, SourceError};
        use async_trait::async_trait;

        struct OneShotSource;

        #[async_trait]
        impl ChatSource for OneShotSource {
            fn name(&self) -> &str {
                "oneshot"
            }

            async fn run(&self, tx: mpsc::Sender<ChatMessage>) -> Result<(), SourceError> {
                tx.send(ChatMessage::new(
                    "oneshot",
                    "alice",
                    "alice",
                    "Mari, can you hear this source?",
                ))
                .await
                .map_err(|e| SourceError::Closed(e.to_string()))
            }
        }

        let agent = Arc::new(CannedAgent::new(vec![
            "Loud and clear from the pipeline.".to_string(),
        ]));
        let (registry, pipeline) = setup(agent);
        let (_presenter, mut rx) = registry.connect_with_id(SessionId::from("default"));

        let cancel = CancellationToken::new();
        let (tx, ingest_rx) = mpsc::channel(16);
        tokio::spawn(pipeline.clone().run(ingest_rx, cancel.clone()));
        ChatPipeline::bind_source(Arc::new(OneShotSource), tx);

        match recv(&mut rx).await {
            ServerFrame::Audio(payload) => {
                assert_eq!(
                    payload.display_text.unwrap().text,
                    "Loud and clear from the pipeline."
                );
            }
            other => panic!("expected audio frame, got {other:?}"),
        }
        cancel.cancel();
    }

    #[tokio::test]
    async fn broadcast_reaches_other_sessions() {
        let agent = Arc::new(CannedAgent::new(vec![
            "Plain reply without any tags here.".to_string(),
        ]));
        let (registry, pipeline) = setup(agent);
        let (_presenter, mut presenter_rx) = registry.connect_with_id(SessionId::from("default"));
        let (viewer, mut viewer_rx) = registry.connect();
        viewer.set_mode(BackendMode::Autonomous);

        pipeline
            .handle(ChatMessage::new(
                "twitch",
                "alice",
                "alice",
                "what do you think of rust, Mari?",
            ))
            .await;

        // presenter gets the audio frame and the broadcast copy
        assert!(matches!(recv(&mut presenter_rx).await, ServerFrame::Audio(_)));
        assert!(matches!(
            recv(&mut presenter_rx).await,
            ServerFrame::AutonomousChat { .. }
        ));
        // the other session only sees the broadcast copy
        assert!(matches!(
            recv(&mut viewer_rx).await,
            ServerFrame::AutonomousChat { .. }
        ));
        assert!(viewer_rx.try_recv().is_err());
    }
}
