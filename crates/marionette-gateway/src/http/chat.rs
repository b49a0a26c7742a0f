//! Chat injection endpoint — lets platform relays (webhooks, sidecar
//! bridges) push messages into the ingest pipeline over plain HTTP.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use marionette_core::types::ChatMessage;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::app::AppState;
use crate::http::animation::bad_request;

#[derive(Debug, Deserialize)]
pub struct InjectBody {
    #[serde(default = "default_platform")]
    pub platform: String,
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
    pub text: String,
}

fn default_platform() -> String {
    "http".to_string()
}

/// POST /api/chat
pub async fn inject_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InjectBody>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(e) => return bad_request(&e.body_text()),
    };
    if req.user_id.is_empty() || req.text.is_empty() {
        return bad_request("user_id and text are required");
    }

    let username = req.username.unwrap_or_else(|| req.user_id.clone());
    let msg = ChatMessage::new(&req.platform, &req.user_id, &username, &req.text);

    match state.chat_tx.try_send(msg) {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "queued" })),
        ),
        Err(e) => {
            warn!(error = %e, "chat ingest queue rejected message");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "error", "error": "ingest queue full" })),
            )
        }
    }
}
