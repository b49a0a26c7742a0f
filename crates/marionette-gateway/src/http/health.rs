use axum::{extract::State, Json};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health — liveness probe with a couple of useful gauges.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "sessions": state.registry.len(),
        "character": state.config.character.name,
    }))
}
