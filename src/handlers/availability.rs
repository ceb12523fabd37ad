use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::errors::AppError;
use crate::models::AppointmentType;
use crate::services::scheduling::scanner::{scan, MAX_HORIZON_DAYS};
use crate::services::scheduling::{
    booking, coerce_future_date, coerce_future_or_today, now_local, slots,
};
use crate::state::AppState;

/// Candidate slots generated before busy-filtering; comfortably above the
/// densest day (28 fifteen-minute slots on a Monday).
const DAY_CANDIDATE_CAP: usize = 100;

/// Most free slots a single-day response will carry.
const DAY_SLOT_LIMIT: usize = 20;
const RANGE_SLOTS_PER_DAY: usize = 6;

fn default_tipo() -> String {
    "Control presencial".to_string()
}

#[derive(Deserialize)]
pub struct AvailabilityBody {
    #[serde(default = "default_tipo")]
    pub tipo: String,
    #[serde(default)]
    pub fecha: Option<String>,
}

#[derive(Deserialize)]
pub struct RangeBody {
    #[serde(default = "default_tipo")]
    pub tipo: String,
    #[serde(default)]
    pub desde: Option<String>,
    #[serde(default = "default_dias")]
    pub dias: i64,
}

fn default_dias() -> i64 {
    14
}

pub async fn availability_day(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AvailabilityBody>,
) -> Result<Response, AppError> {
    let Some(fecha_raw) = body.fecha.as_deref().filter(|f| !f.trim().is_empty()) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "ok": false, "error": "falta_fecha" })),
        )
            .into_response());
    };

    let tipo = AppointmentType::from_label(&body.tipo);
    let fecha = coerce_future_date(fecha_raw, now_local().date_naive());

    let generated = slots::generate(fecha, tipo, DAY_CANDIDATE_CAP);
    let (Some(first), Some(last)) = (generated.windows.first(), generated.windows.last()) else {
        return Ok(Json(json!({
            "ok": true,
            "fecha": fecha,
            "tipo": body.tipo,
            "duracion_min": generated.duration_min,
            "total": 0,
            "slots": [],
        }))
        .into_response());
    };

    let busy = state
        .busy
        .busy_between(first.start, last.end)
        .await
        .map_err(|e| AppError::Calendar(e.to_string()))?;

    // The response cap applies to free slots, after reconciliation; a busy
    // morning must not eat into the afternoon's quota.
    let libres = slots::filter_free(generated.slots, &busy);
    let total = libres.len();
    let slots: Vec<_> = libres.into_iter().take(DAY_SLOT_LIMIT).collect();
    Ok(Json(json!({
        "ok": true,
        "fecha": fecha,
        "tipo": body.tipo,
        "duracion_min": generated.duration_min,
        "total": total,
        "slots": slots,
    }))
    .into_response())
}

pub async fn availability_range(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RangeBody>,
) -> Result<Response, AppError> {
    let Some(desde_raw) = body.desde.as_deref().filter(|d| !d.trim().is_empty()) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "ok": false, "error": "falta_desde" })),
        )
            .into_response());
    };

    let tipo = AppointmentType::from_label(&body.tipo);
    let desde = coerce_future_or_today(desde_raw, now_local().date_naive());
    let dias = body.dias.min(MAX_HORIZON_DAYS);

    let dias_disponibles = scan(state.busy.as_ref(), tipo, desde, dias, RANGE_SLOTS_PER_DAY).await;

    Ok(Json(json!({
        "ok": true,
        "tipo": body.tipo,
        "desde": desde,
        "dias": dias,
        "dias_disponibles": dias_disponibles,
    }))
    .into_response())
}

/// Direct booking endpoint: same validation pipeline the conversation
/// uses, without the LLM in front.
pub async fn book(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let payload = crate::models::ActionPayload {
        action: "crear_cita".to_string(),
        data: body,
    };
    let outcome = booking::validate_booking(
        state.busy.as_ref(),
        state.sink.as_ref(),
        &payload,
        now_local(),
    )
    .await;
    Json(outcome.to_json())
}
