use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use serde_json::json;

/// Why a booking attempt was turned down. The first five are business
/// rules; the last two are infrastructure failures at a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InvalidTime,
    PastTime,
    BeyondHorizon,
    OutsideWindow,
    SlotTaken,
    SinkFailure,
    CollaboratorUnreachable,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::InvalidTime => "invalid_time",
            RejectReason::PastTime => "past_time",
            RejectReason::BeyondHorizon => "beyond_horizon",
            RejectReason::OutsideWindow => "outside_window",
            RejectReason::SlotTaken => "slot_taken",
            RejectReason::SinkFailure => "sink_failure",
            RejectReason::CollaboratorUnreachable => "collaborator_unreachable",
        }
    }

    /// Patient-facing wording, in the voice the assistant uses.
    pub fn message(&self) -> &'static str {
        match self {
            RejectReason::InvalidTime => "Fecha/hora inválida.",
            RejectReason::PastTime => "La hora elegida ya pasó. Elige una fecha futura.",
            RejectReason::BeyondHorizon => "No agendamos más allá de 15 días.",
            RejectReason::OutsideWindow => {
                "Ese día/horario no es válido según las reglas (martes sin consulta u hora fuera de rango)."
            }
            RejectReason::SlotTaken => "Ese horario ya está reservado. Elige otra opción.",
            RejectReason::SinkFailure => "No se pudo registrar la cita. Intenta de nuevo.",
            RejectReason::CollaboratorUnreachable => {
                "No se pudo verificar la agenda en este momento. Intenta de nuevo."
            }
        }
    }
}

/// A nearby free slot offered after a rejection.
#[derive(Debug, Clone, Serialize)]
pub struct Alternative {
    pub fecha: NaiveDate,
    pub inicio: DateTime<FixedOffset>,
    pub fin: DateTime<FixedOffset>,
    pub duracion_min: i64,
}

/// Terminal result of validating one `crear_cita` payload. Accepted wraps
/// the sink's response verbatim.
#[derive(Debug, Clone)]
pub enum BookingOutcome {
    Accepted(serde_json::Value),
    Rejected {
        reason: RejectReason,
        alternatives: Vec<Alternative>,
    },
}

impl BookingOutcome {
    pub fn rejected(reason: RejectReason, alternatives: Vec<Alternative>) -> Self {
        BookingOutcome::Rejected {
            reason,
            alternatives,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, BookingOutcome::Accepted(_))
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            BookingOutcome::Accepted(resp) => resp.clone(),
            BookingOutcome::Rejected {
                reason,
                alternatives,
            } => json!({
                "ok": false,
                "error": reason.as_str(),
                "message": reason.message(),
                "alternativas": alternatives,
            }),
        }
    }
}
