//! `POST /api/chat` and `GET /health`.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{debug, error, info};

use crate::error::{ProxyError, ProxyResult};
use crate::messages::{AssistantReply, ChatRequest};
use crate::AppState;

/// Relays one chat message to the assistant backend.
///
/// A body that is not a JSON object with a non-empty `message` string is
/// answered with 400 and never forwarded.
pub async fn chat_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ProxyResult<Json<AssistantReply>> {
    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!("unreadable chat request body: {e}");
            ChatRequest::default()
        }
    };

    let message = request
        .message
        .filter(|m| !m.is_empty())
        .ok_or(ProxyError::MissingMessage)?;

    match state.upstream.ask(&message).await {
        Ok(reply) => {
            info!(len = reply.content.len(), has_urls = reply.urls.is_some(), "chat turn answered");
            Ok(Json(reply))
        }
        Err(e) => {
            error!("chat turn failed: {e}");
            Err(e)
        }
    }
}

/// Health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "doc-chat-proxy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
