//! REST animation commands — expression and motion triggers.
//!
//! Both endpoints resolve their target session (lazily creating a virtual
//! one for unknown uids), invoke the session's adapter, and report the
//! outcome. Domain failures (unknown expression / motion group) are HTTP
//! 200 with `status:"error"`; only malformed payloads are 400.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use marionette_core::ControlError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::app::AppState;
use crate::http::resolve_session;

#[derive(Debug, Deserialize)]
pub struct ExpressionRequest {
    #[serde(rename = "expressionId")]
    pub expression_id: i64,
    /// Milliseconds; 0 means the expression is permanent.
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub client_uid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MotionRequest {
    #[serde(rename = "motionGroup")]
    pub motion_group: String,
    #[serde(rename = "motionIndex")]
    pub motion_index: u32,
    #[serde(rename = "loop", default)]
    pub looped: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub client_uid: Option<String>,
}

/// POST /api/expression
pub async fn expression_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ExpressionRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(e) => return bad_request(&e.body_text()),
    };

    let session_id = resolve_session(req.client_uid.as_deref(), &headers);
    let session = state.registry.get_or_default(&session_id);

    match session
        .adapter()
        .trigger_expression(req.expression_id, req.duration, req.priority)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "success",
                "expression_id": req.expression_id,
                "result": { "status": "success" },
            })),
        ),
        Err(e) => {
            warn!(session = %session_id, error = %e, "expression command failed");
            command_error(e, serde_json::json!({ "expression_id": req.expression_id }))
        }
    }
}

/// POST /api/motion
pub async fn motion_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<MotionRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(e) => return bad_request(&e.body_text()),
    };

    let session_id = resolve_session(req.client_uid.as_deref(), &headers);
    let session = state.registry.get_or_default(&session_id);

    match session
        .adapter()
        .trigger_motion(&req.motion_group, req.motion_index, req.looped, req.priority)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "success",
                "motion_group": req.motion_group,
                "motion_index": req.motion_index,
                "result": { "status": "success" },
            })),
        ),
        Err(e) => {
            warn!(session = %session_id, error = %e, "motion command failed");
            command_error(
                e,
                serde_json::json!({
                    "motion_group": req.motion_group,
                    "motion_index": req.motion_index,
                }),
            )
        }
    }
}

/// Malformed payload: HTTP 400 with a plain error body.
pub(crate) fn bad_request(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "status": "error", "error": message })),
    )
}

/// Domain failure: HTTP 200 with `status:"error"` and the error mirrored
/// into the `result` object.
pub(crate) fn command_error(
    e: ControlError,
    mut extra: serde_json::Value,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut body = serde_json::json!({
        "status": "error",
        "result": { "status": "error", "code": e.code(), "error": e.to_string() },
    });
    if let (Some(body_map), Some(extra_map)) = (body.as_object_mut(), extra.as_object_mut()) {
        body_map.append(extra_map);
    }
    (StatusCode::OK, Json(body))
}
