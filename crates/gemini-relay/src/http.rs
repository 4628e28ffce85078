//! Thin HTTP surface over the chat service.
//!
//! Every dispatch failure maps to one generic error body; the precise
//! kind goes to the logs only. Replies are split to the chat message
//! length limit before they are returned.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use relay_client::Attachment;
use relay_core::DispatchError;

use crate::service::ChatService;
use crate::split::{MAX_MESSAGE_LEN, split_reply};

#[derive(Clone)]
pub struct AppState {
    service: Arc<ChatService>,
}

pub fn router(service: Arc<ChatService>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/chat", post(chat))
        .route("/v1/history/clear", post(clear_history))
        .with_state(AppState { service })
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    actor_id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    attachments: Vec<AttachmentPayload>,
    model: Option<String>,
}

/// Inbound attachment: base64 bytes inline, or a path readable by the
/// relay process.
#[derive(Debug, Deserialize)]
struct AttachmentPayload {
    mime_type: String,
    data_base64: Option<String>,
    path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    segments: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ClearRequest {
    actor_id: String,
}

async fn healthz(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "eligible_keys": state.service.eligible_keys(),
    }))
}

async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    let attachments: Vec<Attachment> = match request
        .attachments
        .iter()
        .map(decode_attachment)
        .collect::<Result<_, _>>()
    {
        Ok(attachments) => attachments,
        Err(detail) => {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": detail}))).into_response();
        }
    };

    match state
        .service
        .chat(
            &request.actor_id,
            &request.text,
            &attachments,
            request.model.as_deref(),
        )
        .await
    {
        Ok(reply) => Json(ChatResponse {
            segments: split_reply(&reply, MAX_MESSAGE_LEN),
        })
        .into_response(),
        Err(err) => dispatch_failure(&request.actor_id, &err),
    }
}

async fn clear_history(
    State(state): State<AppState>,
    Json(request): Json<ClearRequest>,
) -> Json<serde_json::Value> {
    state.service.clear_history(&request.actor_id).await;
    Json(json!({"status": "cleared"}))
}

fn decode_attachment(payload: &AttachmentPayload) -> Result<Attachment, String> {
    if let Some(data) = &payload.data_base64 {
        let bytes = STANDARD
            .decode(data)
            .map_err(|err| format!("invalid attachment base64: {err}"))?;
        return Ok(Attachment::from_bytes(&payload.mime_type, bytes));
    }
    if let Some(path) = &payload.path {
        return Ok(Attachment::from_path(&payload.mime_type, path));
    }
    Err("attachment needs data_base64 or path".to_string())
}

/// One generic failure body per aborted dispatch; the kind is logged.
fn dispatch_failure(actor: &str, err: &DispatchError) -> Response {
    let status = match err {
        DispatchError::ActorBusy(_) => StatusCode::CONFLICT,
        DispatchError::EmptyPrompt | DispatchError::AttachmentRead { .. } => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::BAD_GATEWAY,
    };
    error!(actor = %actor, error = %err, "dispatch failed");
    (status, Json(json!({"error": "Error"}))).into_response()
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
