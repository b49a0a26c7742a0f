//! REST surface of the autonomous subsystem: direct speech injection,
//! one-shot generation, and scheduler control/status.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use marionette_core::config::COLLABORATOR_TIMEOUT_SECS;
use marionette_core::ControlError;
use marionette_protocol::MotionSpec;
use marionette_sessions::SpeakRequest;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::app::AppState;
use crate::http::animation::{bad_request, command_error};
use crate::http::resolve_session;

#[derive(Debug, Deserialize)]
pub struct SpeakBody {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub expressions: Vec<i64>,
    #[serde(default)]
    pub motions: Vec<MotionSpec>,
    #[serde(default)]
    pub client_uid: Option<String>,
    #[serde(default)]
    pub skip_tts: bool,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// POST /api/autonomous/speak — dispatch pre-generated speech/animation to
/// a session through its external-API adapter.
pub async fn speak_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SpeakBody>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(e) => return bad_request(&e.body_text()),
    };

    let has_text = req.text.as_deref().is_some_and(|t| !t.trim().is_empty());
    if !has_text && req.expressions.is_empty() && req.motions.is_empty() {
        return bad_request("at least one of text, expressions, motions is required");
    }

    let mut expressions = Vec::with_capacity(req.expressions.len());
    for id in &req.expressions {
        match u32::try_from(*id) {
            Ok(id) => expressions.push(id),
            Err(_) => {
                return command_error(
                    ControlError::not_found(format!("expression {id}")),
                    serde_json::json!({}),
                )
            }
        }
    }

    let session_id = resolve_session(req.client_uid.as_deref(), &headers);
    let session = state.registry.get_or_default(&session_id);
    let adapter = session.adapter_for(marionette_core::types::BackendMode::ExternalApi);

    let speak = adapter.speak(SpeakRequest {
        text: req.text.clone(),
        expressions: expressions.clone(),
        motions: req.motions.clone(),
        skip_tts: req.skip_tts,
        display: None,
    });
    let outcome = match tokio::time::timeout(
        Duration::from_secs(COLLABORATOR_TIMEOUT_SECS),
        speak,
    )
    .await
    {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            warn!(session = %session_id, error = %e, "speak dispatch failed");
            return command_error(e, serde_json::json!({}));
        }
        Err(_) => {
            warn!(session = %session_id, "speak dispatch timed out");
            return command_error(
                ControlError::Timeout {
                    ms: COLLABORATOR_TIMEOUT_SECS * 1000,
                },
                serde_json::json!({}),
            );
        }
    };

    let motions: Vec<String> = req
        .motions
        .iter()
        .map(|m| format!("{}/{}", m.group, m.index))
        .collect();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "success",
            "message_id": Uuid::new_v4().to_string(),
            "text": req.text.unwrap_or_default(),
            "expressions": expressions,
            "motions": motions,
            "tts_generated": outcome.tts_generated,
            "metadata": req.metadata.unwrap_or_else(|| serde_json::json!({})),
        })),
    )
}

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub prompt: String,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
    #[serde(default)]
    pub client_uid: Option<String>,
}

/// POST /api/autonomous/generate — one-shot text generation. Chunks are
/// also streamed onto the target session as `text-generation-*` frames.
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<GenerateBody>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(e) => return bad_request(&e.body_text()),
    };
    if req.prompt.trim().is_empty() {
        return bad_request("prompt must not be empty");
    }

    let session_id = resolve_session(req.client_uid.as_deref(), &headers);
    let session = state.registry.get_or_default(&session_id);
    let context = req.context.unwrap_or(serde_json::Value::Null);

    let adapter = session.adapter();
    let generate = adapter.generate_text(&req.prompt, &context);
    match tokio::time::timeout(Duration::from_secs(COLLABORATOR_TIMEOUT_SECS), generate).await {
        Ok(Ok(text)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "text": text,
                "metadata": {
                    "engine": session.context().agent.engine_name(),
                    "character": session.context().model.character_name,
                },
            })),
        ),
        Ok(Err(e)) => {
            warn!(session = %session_id, error = %e, "generation failed");
            command_error(e, serde_json::json!({}))
        }
        Err(_) => {
            warn!(session = %session_id, "generation timed out");
            command_error(
                ControlError::Timeout {
                    ms: COLLABORATOR_TIMEOUT_SECS * 1000,
                },
                serde_json::json!({}),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ControlBody {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub min_interval: Option<f64>,
    #[serde(default)]
    pub max_interval: Option<f64>,
}

/// POST /api/autonomous/control — runtime scheduler reconfiguration.
/// Interval changes take effect at the scheduler's next sleep.
pub async fn control_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ControlBody>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(e) => return bad_request(&e.body_text()),
    };

    if req.min_interval.is_some() || req.max_interval.is_some() {
        let (current_min, current_max) = state.policy.intervals();
        let min = req.min_interval.unwrap_or(current_min);
        let max = req.max_interval.unwrap_or(current_max);
        if let Err(e) = state.policy.set_intervals(min, max) {
            return bad_request(&e.to_string());
        }
    }
    if let Some(enabled) = req.enabled {
        state.policy.set_enabled(enabled);
    }

    let snap = state.policy.snapshot();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "success",
            "enabled": snap.enabled,
            "min_interval": snap.min_interval,
            "max_interval": snap.max_interval,
        })),
    )
}

/// GET /api/autonomous/status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let presenter = state.registry.get_or_default(&state.presenter);
    let model = &presenter.context().model;
    let snap = state.policy.snapshot();

    Json(serde_json::json!({
        "mode": presenter.mode().to_string(),
        "active": snap.enabled,
        "character": model.character_name,
        "character_id": model.character_id,
        "autonomous_generator_enabled": snap.enabled,
        "autonomous_generator_interval": (snap.min_interval + snap.max_interval) / 2.0,
        "min_interval_seconds": snap.min_interval,
        "max_interval_seconds": snap.max_interval,
        "auto_responses_enabled": state.pipeline.auto_responses_enabled(),
    }))
}
