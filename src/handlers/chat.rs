use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::errors::AppError;
use crate::services::conversation;
use crate::state::AppState;

fn default_session() -> String {
    "default".to_string()
}

#[derive(Deserialize)]
pub struct ChatBody {
    #[serde(default = "default_session")]
    pub session: String,
    #[serde(default)]
    pub message: String,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let message = body.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("falta_message".to_string()));
    }

    if message == "__RESET__" {
        let mut sessions = state.sessions.lock().unwrap();
        sessions.remove(&body.session);
        return Ok(Json(json!({ "ok": true, "reply": "Sesión reiniciada." })));
    }

    let outcome = conversation::process_message(&state, &body.session, message)
        .await
        .map_err(|e| AppError::Ai(e.to_string()))?;

    Ok(Json(json!({
        "ok": true,
        "reply": outcome.reply,
        "results": outcome.results,
    })))
}
