//! The autonomous speech loop: sleep a random interval, ask the agent for
//! something to say, and fan it out to every session in autonomous mode.

use marionette_agent::select_best;
use marionette_core::types::{BackendMode, SessionId};
use marionette_core::{ControlError, Result};
use marionette_model::emotions;
use marionette_protocol::ServerFrame;
use marionette_sessions::{SessionRegistry, SpeakRequest};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::policy::AutonomousPolicy;

pub struct AutonomousScheduler {
    policy: Arc<AutonomousPolicy>,
    registry: Arc<SessionRegistry>,
    presenter: SessionId,
}

impl AutonomousScheduler {
    pub fn new(
        policy: Arc<AutonomousPolicy>,
        registry: Arc<SessionRegistry>,
        presenter: SessionId,
    ) -> Self {
        Self {
            policy,
            registry,
            presenter,
        }
    }

    /// Main loop. Interval updates apply at the next sleep; a disabled
    /// policy keeps the loop ticking so enabling takes effect without a
    /// restart.
    pub async fn run(self, cancel: CancellationToken) {
        info!("autonomous scheduler started");
        loop {
            let (min, max) = self.policy.intervals();
            let wait = sample_interval(min, max);
            debug!(secs = wait.as_secs_f64(), "scheduler sleeping");

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            if !self.policy.is_enabled() {
                continue;
            }
            if let Err(e) = self.tick().await {
                warn!(error = %e, "autonomous tick failed");
            }
        }
        info!("autonomous scheduler stopped");
    }

    /// One autonomous speech event.
    pub async fn tick(&self) -> Result<()> {
        let prompt = {
            let pool = self.policy.prompt_pool();
            let i = rand::thread_rng().gen_range(0..pool.len());
            pool[i].clone()
        };

        let presenter = self.registry.get_or_default(&self.presenter);
        let reply =
            select_best(presenter.context().agent.as_ref(), &prompt, &serde_json::Value::Null)
                .await;
        if reply.is_empty() {
            return Err(ControlError::external("agent", "no candidate survived"));
        }

        let (expressions, display) =
            emotions::extract_and_strip(&reply, presenter.context().model.emotion_map());
        let display = display.trim().to_string();

        let targets = self.registry.sessions_in_mode(BackendMode::Autonomous);
        debug!(sessions = targets.len(), "dispatching autonomous speech");
        for session in targets {
            let adapter = session.adapter_for(BackendMode::Autonomous);
            if let Err(e) = adapter
                .speak(SpeakRequest {
                    text: Some(display.clone()),
                    expressions: expressions.clone(),
                    ..Default::default()
                })
                .await
            {
                warn!(session = %session.id(), error = %e, "autonomous speak failed");
            }
        }

        let character = presenter.context().model.character_name.clone();
        self.registry.broadcast(
            |_| true,
            ServerFrame::AutonomousChat {
                text: display,
                character,
            },
        );
        Ok(())
    }
}

/// Uniform draw from `[min, max]` seconds.
fn sample_interval(min: f64, max: f64) -> Duration {
    let secs = if max > min {
        rand::thread_rng().gen_range(min..=max)
    } else {
        min
    };
    Duration::from_secs_f64(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_agent::stub::CannedAgent;
    use marionette_core::config::AutonomousConfig;
    use marionette_model::LiveModelDescriptor;
    use marionette_sessions::EngineSet;

    fn setup(lines: Vec<String>) -> (Arc<SessionRegistry>, AutonomousScheduler) {
        let registry = Arc::new(SessionRegistry::new(EngineSet {
            agent: Arc::new(CannedAgent::new(lines)),
            tts: None,
            asr: None,
            model: Arc::new(LiveModelDescriptor::from_config(&Default::default())),
        }));
        let policy = Arc::new(
            AutonomousPolicy::from_config(&AutonomousConfig {
                enabled: true,
                ..Default::default()
            })
            .unwrap(),
        );
        let scheduler = AutonomousScheduler::new(
            policy,
            registry.clone(),
            SessionId::from("default"),
        );
        (registry, scheduler)
    }

    #[test]
    fn sampled_intervals_stay_in_bounds() {
        for _ in 0..200 {
            let d = sample_interval(2.0, 5.0).as_secs_f64();
            assert!((2.0..=5.0).contains(&d), "sampled {d}");
        }
        assert_eq!(sample_interval(3.0, 3.0), Duration::from_secs_f64(3.0));
    }

    #[tokio::test]
    async fn tick_speaks_to_autonomous_sessions_only() {
        let (registry, scheduler) = setup(vec![
            "[joy] Autonomous hello to everyone watching!".to_string(),
        ]);
        let (auto_session, mut auto_rx) = registry.connect();
        auto_session.set_mode(BackendMode::Autonomous);
        let (_plain_session, mut plain_rx) = registry.connect();

        scheduler.tick().await.unwrap();

        // autonomous session: one audio frame then the broadcast copy
        match auto_rx.try_recv().unwrap() {
            ServerFrame::Audio(payload) => {
                assert_eq!(payload.actions.unwrap().expressions, vec![3]);
                let display = payload.display_text.unwrap();
                assert_eq!(display.text, "Autonomous hello to everyone watching!");
            }
            other => panic!("expected audio frame, got {other:?}"),
        }
        assert!(matches!(
            auto_rx.try_recv().unwrap(),
            ServerFrame::AutonomousChat { .. }
        ));

        // internal-mode session: broadcast copy only
        assert!(matches!(
            plain_rx.try_recv().unwrap(),
            ServerFrame::AutonomousChat { .. }
        ));
        assert!(plain_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn tick_with_failing_agent_is_contained() {
        // Canned agent with no lines fails every generation.
        let (registry, scheduler) = setup(Vec::new());
        let (session, mut rx) = registry.connect();
        session.set_mode(BackendMode::Autonomous);

        let err = scheduler.tick().await.unwrap_err();
        assert_eq!(err.code(), "EXTERNAL_SERVICE_ERROR");
        assert!(rx.try_recv().is_err());
    }
}
