use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::services::conversation;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode", default)]
    pub mode: String,
    #[serde(rename = "hub.verify_token", default)]
    pub verify_token: String,
    #[serde(rename = "hub.challenge", default)]
    pub challenge: String,
}

/// Meta webhook handshake: echo the challenge when the verify token
/// matches, 403 otherwise.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Response {
    if params.mode == "subscribe" && params.verify_token == state.config.wa_verify_token {
        tracing::info!("webhook verified");
        return (StatusCode::OK, params.challenge).into_response();
    }
    StatusCode::FORBIDDEN.into_response()
}

/// Incoming WhatsApp messages. Always answers 200 so Meta does not
/// retry; failures are logged and the patient gets a fallback text.
pub async fn receive(
    State(state): State<Arc<AppState>>,
    Json(envelope): Json<serde_json::Value>,
) -> StatusCode {
    let Some(message) = envelope.pointer("/entry/0/changes/0/value/messages/0") else {
        // Status updates and other notifications arrive on the same URL.
        return StatusCode::OK;
    };

    let Some(from) = message["from"].as_str().map(str::to_string) else {
        return StatusCode::OK;
    };

    let text = message
        .pointer("/text/body")
        .and_then(|v| v.as_str())
        .or_else(|| {
            // Button and list replies carry their label instead of a body.
            message
                .pointer("/interactive/button_reply/title")
                .and_then(|v| v.as_str())
        })
        .or_else(|| {
            message
                .pointer("/interactive/list_reply/title")
                .and_then(|v| v.as_str())
        })
        .map(str::to_string);

    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        tracing::debug!(from = %from, "ignoring non-text message");
        return StatusCode::OK;
    };

    tracing::info!(from = %from, "incoming WhatsApp message");

    let reply = match conversation::process_message(&state, &from, text.trim()).await {
        Ok(outcome) => outcome.reply,
        Err(e) => {
            tracing::error!(error = %e, from = %from, "conversation turn failed");
            "Lo siento, tuve un problema procesando tu mensaje. Intenta de nuevo en un momento."
                .to_string()
        }
    };

    if let Err(e) = state.messaging.send_message(&from, &reply).await {
        tracing::error!(error = %e, to = %from, "failed to deliver reply");
    }

    StatusCode::OK
}
