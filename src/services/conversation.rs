use std::sync::Arc;

use chrono::DateTime;
use serde_json::json;

use crate::models::{Action, ActionPayload, AppointmentType, BookingOutcome, ConversationMessage, DayQuery, RangeQuery, RejectReason};
use crate::services::ai::Message;
use crate::services::intent::extract_actions;
use crate::services::scheduling::scanner::{scan, MAX_HORIZON_DAYS};
use crate::services::scheduling::{
    booking, coerce_future_date, coerce_future_or_today, now_local, slots,
};
use crate::state::AppState;

const SYSTEM_PROMPT: &str = r#"Eres Sana, el asistente virtual de la consulta de mastología del Dr. Juan Felipe Arias.
Recibes pacientes, registras sus datos y gestionas disponibilidad y agendamiento
devolviendo bloques JSON cuando necesitas que el sistema actúe.

Motivos de consulta: Primera vez (20 min), Control presencial (15 min),
Control virtual (10 min), Biopsia guiada por ecografía (30 min).
Programación de cirugía o actualización de órdenes: transferir a un humano.

Agenda (reglas estrictas):
- Lunes (presencial): 08:00-11:30 y 14:00-17:30.
- Martes: sin consulta, rechaza cualquier intento.
- Miércoles y jueves (presencial): 14:00-16:30.
- Viernes: presencial 08:00-11:30; virtual 14:00-17:30 (solo controles virtuales).
- Nunca propongas martes, fechas pasadas ni citas a más de 15 días.
- No inventes horarios: consulta disponibilidad primero y ofrece solo lo que
  devuelva el sistema.
- No declares la cita confirmada en texto: emite el bloque JSON y espera la
  confirmación del sistema.

Para toda cita necesitas nombre completo, cédula y entidad de salud antes de
confirmar. Dirígete al paciente por su nombre, sin emojis, claro y breve.

Cuando necesites actuar, devuelve exclusivamente un bloque JSON válido.
Si necesitas dos acciones (guardar y luego agendar), envía cada bloque por
separado y en ese orden.

1) Guardar paciente:
{ "action": "guardar_paciente", "data": { "nombre": "...", "cedula": "...", "entidad_salud": "..." } }

2) Disponibilidad de un día (fecha YYYY-MM-DD):
{ "action": "consultar_disponibilidad", "data": { "tipo": "Control presencial", "fecha": "2025-10-06" } }

3) Días con cupo (rango):
{ "action": "consultar_disponibilidad_rango", "data": { "tipo": "Control presencial", "desde": "2025-10-01", "dias": 14 } }

4) Crear cita (solo con un horario devuelto por disponibilidad):
{ "action": "crear_cita", "data": { "nombre": "...", "cedula": "...", "entidad_salud": "...", "tipo": "Control presencial", "inicio": "2025-10-06T08:00:00-05:00", "fin": "2025-10-06T08:15:00-05:00" } }

Si el sistema responde "ocupado" o "fuera de horario", no lo contradigas:
propón las alternativas que entregue."#;

/// Chat replies stay short: at most 12 slots for a single day, 6 per day
/// for range summaries.
const DAY_REPLY_SLOT_CAP: usize = 12;
const RANGE_SLOTS_PER_DAY: usize = 6;
const DAY_GENERATION_CAP: usize = 60;

pub struct ChatOutcome {
    pub reply: String,
    pub results: Vec<serde_json::Value>,
}

/// One full conversational turn for a session: LLM reply, action
/// extraction, dispatch, and a formatted summary when actions ran.
pub async fn process_message(
    state: &Arc<AppState>,
    session_id: &str,
    message: &str,
) -> anyhow::Result<ChatOutcome> {
    let now = now_local();
    let today_note = format!(
        "Hoy es {} (America/Bogota). Recuerda: martes sin consulta; control virtual solo viernes en la tarde; no agendar a más de 15 días; no usar fechas pasadas.",
        now.date_naive()
    );

    // Mutate the session under the lock, then release it before any await.
    let messages: Vec<Message> = {
        let mut sessions = state.sessions.lock().unwrap();
        let session = sessions.entry(session_id.to_string()).or_default();
        session.messages.push(ConversationMessage {
            role: "system".to_string(),
            content: today_note,
        });
        if let Some(note) = session.last_system_note.take() {
            session.messages.push(ConversationMessage {
                role: "system".to_string(),
                content: note,
            });
        }
        session.messages.push(ConversationMessage {
            role: "user".to_string(),
            content: message.to_string(),
        });
        session
            .messages
            .iter()
            .map(|m| Message {
                role: m.role.clone(),
                content: m.content.clone(),
            })
            .collect()
    };

    let llm_reply = state.llm.chat(SYSTEM_PROMPT, &messages).await?;

    let payloads = extract_actions(&llm_reply);
    tracing::info!(
        session = session_id,
        actions = payloads.len(),
        "processing assistant reply"
    );

    let (results, note) = dispatch_actions(state, &payloads).await;

    let reply = if results.is_empty() {
        llm_reply
    } else {
        format_results(&results).unwrap_or(llm_reply)
    };

    {
        let mut sessions = state.sessions.lock().unwrap();
        let session = sessions.entry(session_id.to_string()).or_default();
        session.messages.push(ConversationMessage {
            role: "assistant".to_string(),
            content: reply.clone(),
        });
        session.last_system_note = note;
    }

    Ok(ChatOutcome { reply, results })
}

/// Runs every extracted action in order. Returns the structured results
/// plus a system note describing the last booking attempt, so the next
/// turn's LLM call knows what happened.
async fn dispatch_actions(
    state: &Arc<AppState>,
    payloads: &[ActionPayload],
) -> (Vec<serde_json::Value>, Option<String>) {
    let mut results = Vec::new();
    let mut note = None;

    for payload in payloads {
        match payload.kind() {
            Action::QueryDayAvailability => {
                results.push(day_availability(state, payload).await);
            }
            Action::QueryRangeAvailability => {
                results.push(range_availability(state, payload).await);
            }
            Action::CreateAppointment => {
                let outcome = booking::validate_booking(
                    state.busy.as_ref(),
                    state.sink.as_ref(),
                    payload,
                    now_local(),
                )
                .await;
                note = Some(booking_note(&outcome));
                results.push(outcome.to_json());
            }
            Action::SavePatient => match serde_json::to_value(payload) {
                Ok(v) => match state.sink.dispatch(&v).await {
                    Ok(resp) => results.push(resp),
                    Err(e) => {
                        tracing::error!(error = %e, "sink unreachable while saving patient");
                        results.push(json!({
                            "ok": false,
                            "error": RejectReason::CollaboratorUnreachable.as_str(),
                            "message": RejectReason::CollaboratorUnreachable.message(),
                        }));
                    }
                },
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize patient payload");
                }
            },
            Action::Unrecognized => {
                tracing::debug!(action = %payload.action, "ignoring unrecognized action");
            }
        }
    }

    (results, note)
}

async fn day_availability(state: &Arc<AppState>, payload: &ActionPayload) -> serde_json::Value {
    let query: DayQuery = serde_json::from_value(payload.data.clone()).unwrap_or(DayQuery {
        tipo: "Control presencial".to_string(),
        fecha: None,
    });
    let tipo = AppointmentType::from_label(&query.tipo);
    let today = now_local().date_naive();
    let fecha = match &query.fecha {
        Some(f) => coerce_future_date(f, today),
        None => today,
    };

    let generated = slots::generate(fecha, tipo, DAY_GENERATION_CAP);
    let (Some(first), Some(last)) = (generated.windows.first(), generated.windows.last()) else {
        return json!({
            "ok": true,
            "fecha": fecha,
            "tipo": query.tipo,
            "duracion_min": generated.duration_min,
            "slots": [],
            "note": "Día sin consulta según reglas",
        });
    };

    let busy = match state.busy.busy_between(first.start, last.end).await {
        Ok(busy) => busy,
        Err(e) => {
            tracing::error!(error = %e, %fecha, "busy query failed for day availability");
            return json!({
                "ok": false,
                "error": RejectReason::CollaboratorUnreachable.as_str(),
                "message": RejectReason::CollaboratorUnreachable.message(),
            });
        }
    };

    let libres: Vec<_> = slots::filter_free(generated.slots, &busy)
        .into_iter()
        .take(DAY_REPLY_SLOT_CAP)
        .collect();
    json!({
        "ok": true,
        "fecha": fecha,
        "tipo": query.tipo,
        "duracion_min": generated.duration_min,
        "slots": libres,
    })
}

async fn range_availability(state: &Arc<AppState>, payload: &ActionPayload) -> serde_json::Value {
    let query: RangeQuery = serde_json::from_value(payload.data.clone()).unwrap_or(RangeQuery {
        tipo: "Control presencial".to_string(),
        desde: None,
        dias: 14,
    });
    let tipo = AppointmentType::from_label(&query.tipo);
    let today = now_local().date_naive();
    let desde = match &query.desde {
        Some(d) => coerce_future_or_today(d, today),
        None => today,
    };
    let dias = query.dias.min(MAX_HORIZON_DAYS);

    let dias_disponibles = scan(
        state.busy.as_ref(),
        tipo,
        desde,
        dias,
        RANGE_SLOTS_PER_DAY,
    )
    .await;

    json!({
        "ok": true,
        "tipo": query.tipo,
        "desde": desde,
        "dias": dias,
        "dias_disponibles": dias_disponibles,
    })
}

fn booking_note(outcome: &BookingOutcome) -> String {
    match outcome {
        BookingOutcome::Accepted(_) => {
            "La última cita fue creada correctamente en el calendario.".to_string()
        }
        BookingOutcome::Rejected { reason, .. } => format!(
            "El último intento de cita falló ({}). Se propusieron alternativas si las había.",
            reason.as_str()
        ),
    }
}

/// Renders the dispatched results as the patient-facing reply. Mirrors
/// the priority order: failures first, then single-day slots, then range
/// summaries; anything else keeps the assistant's own wording.
fn format_results(results: &[serde_json::Value]) -> Option<String> {
    let errors: Vec<&serde_json::Value> = results.iter().filter(|r| r["ok"] == false).collect();
    if !errors.is_empty() {
        let text = errors
            .iter()
            .map(|e| format_error(e))
            .collect::<Vec<_>>()
            .join("\n\n");
        return Some(text);
    }

    if let Some(day) = results
        .iter()
        .find(|r| r["slots"].is_array() && r["fecha"].is_string())
    {
        return Some(format_day(day));
    }

    if let Some(range) = results.iter().find(|r| r["dias_disponibles"].is_array()) {
        return Some(format_range(range));
    }

    None
}

fn format_error(e: &serde_json::Value) -> String {
    let mut line = format!(
        "No fue posible: {}",
        e["message"].as_str().unwrap_or("No se pudo crear la cita.")
    );
    if let Some(alts) = e["alternativas"].as_array().filter(|a| !a.is_empty()) {
        let opts = alts
            .iter()
            .enumerate()
            .map(|(i, a)| format!("{}) {}", i + 1, day_and_time(&a["inicio"])))
            .collect::<Vec<_>>()
            .join(", ");
        line.push_str(&format!("\nOpciones: {opts}"));
    }
    line
}

fn format_day(day: &serde_json::Value) -> String {
    let fecha = day["fecha"].as_str().unwrap_or("?");
    let tipo = day["tipo"].as_str().unwrap_or("consulta");
    let slots = day["slots"].as_array().map(Vec::as_slice).unwrap_or(&[]);
    if slots.is_empty() {
        return format!(
            "Para {fecha} ({tipo}) no hay cupos válidos (o está todo ocupado). ¿Quieres otra fecha?"
        );
    }
    let items = slots
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}) {}", i + 1, time_of(&s["inicio"])))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Disponibilidad para {fecha} ({tipo}, {} min): {items}. Elige un número.",
        day["duracion_min"].as_i64().unwrap_or(0)
    )
}

fn format_range(range: &serde_json::Value) -> String {
    let tipo = range["tipo"].as_str().unwrap_or("consulta");
    let dias = range["dias"].as_i64().unwrap_or(0);
    let disponibles = range["dias_disponibles"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    if disponibles.is_empty() {
        return format!(
            "No tengo cupos en los próximos {dias} días para {tipo}. ¿Probamos otro rango?"
        );
    }
    let lineas = disponibles
        .iter()
        .map(|d| {
            let ejemplos = d["ejemplos"]
                .as_array()
                .map(|e| {
                    e.iter()
                        .filter_map(|h| h.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            format!(
                "- {} ({} min): {ejemplos}",
                d["fecha"].as_str().unwrap_or("?"),
                d["duracion_min"].as_i64().unwrap_or(0)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("Días con cupo:\n{lineas}\n\n¿Quieres alguno de esos días/horas?")
}

fn time_of(v: &serde_json::Value) -> String {
    v.as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn day_and_time(v: &serde_json::Value) -> String {
    v.as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.format("%d-%m %H:%M").to_string())
        .unwrap_or_else(|| "?".to_string())
}
