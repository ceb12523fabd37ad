use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("AI provider error: {0}")]
    Ai(String),

    #[error("calendar error: {0}")]
    Calendar(String),

    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Ai(_) => StatusCode::BAD_GATEWAY,
            AppError::Calendar(_) => StatusCode::BAD_GATEWAY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = serde_json::json!({ "ok": false, "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
