pub mod animation;
pub mod autonomous;
pub mod chat;
pub mod health;

use axum::http::HeaderMap;
use marionette_core::types::SessionId;

/// Resolve the target session id: body `client_uid` wins over the
/// `X-Client-UID` header, falling back to `"default"`.
pub(crate) fn resolve_session(body_uid: Option<&str>, headers: &HeaderMap) -> SessionId {
    if let Some(uid) = body_uid.filter(|s| !s.is_empty()) {
        return SessionId::from(uid);
    }
    if let Some(uid) = headers
        .get("x-client-uid")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
    {
        return SessionId::from(uid);
    }
    SessionId::default_client()
}
