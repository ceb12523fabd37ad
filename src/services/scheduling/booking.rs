use chrono::{DateTime, Duration, FixedOffset, TimeZone};

use crate::models::{
    ActionPayload, AppointmentType, BookingOutcome, BookingRequest, RejectReason,
};
use crate::services::calendar::BusySource;
use crate::services::scheduling::scanner::{nearby_alternatives, MAX_HORIZON_DAYS};
use crate::services::scheduling::{clinic_zone, parse_instant, slots};
use crate::services::sink::PersistenceSink;

const ALTERNATIVES_LIMIT: usize = 6;
const ALTERNATIVES_SCAN_DAYS: i64 = 10;

/// Validates one `crear_cita` payload against the temporal, window and
/// occupancy rules, in order; the first failed check ends the run. On
/// success the payload goes to the sink verbatim and the sink's verdict is
/// the final word. `now` is injected so callers (and tests) control time.
pub async fn validate_booking(
    busy_source: &dyn BusySource,
    sink: &dyn PersistenceSink,
    payload: &ActionPayload,
    now: DateTime<FixedOffset>,
) -> BookingOutcome {
    let req: BookingRequest = match serde_json::from_value(payload.data.clone()) {
        Ok(r) => r,
        Err(_) => return BookingOutcome::rejected(RejectReason::InvalidTime, vec![]),
    };
    let tipo = AppointmentType::from_label(&req.tipo);

    // 1. Both instants must parse and be ordered.
    let (start, end) = match (parse_instant(&req.start), parse_instant(&req.end)) {
        (Some(s), Some(e)) if s < e => (s, e),
        _ => return BookingOutcome::rejected(RejectReason::InvalidTime, vec![]),
    };

    // 2. Not in the past.
    if start < now {
        let alternatives = nearby_alternatives(
            busy_source,
            tipo,
            now.date_naive(),
            ALTERNATIVES_SCAN_DAYS,
            ALTERNATIVES_LIMIT,
        )
        .await;
        return BookingOutcome::rejected(RejectReason::PastTime, alternatives);
    }

    // 3. Inside the 15-day horizon (through the end of that last day).
    if start > end_of_horizon(now) {
        let alternatives = nearby_alternatives(
            busy_source,
            tipo,
            now.date_naive(),
            MAX_HORIZON_DAYS,
            ALTERNATIVES_LIMIT,
        )
        .await;
        return BookingOutcome::rejected(RejectReason::BeyondHorizon, alternatives);
    }

    // 4. Fully inside a bookable window for that day and type.
    if !slots::within_windows(start, end, tipo) {
        let alternatives = nearby_alternatives(
            busy_source,
            tipo,
            start.date_naive(),
            ALTERNATIVES_SCAN_DAYS,
            ALTERNATIVES_LIMIT,
        )
        .await;
        return BookingOutcome::rejected(RejectReason::OutsideWindow, alternatives);
    }

    // 5. Nothing already on the calendar may overlap. A failed busy query
    // must never turn into a silent approval.
    let busy = match busy_source.busy_between(start, end).await {
        Ok(busy) => busy,
        Err(e) => {
            tracing::error!(error = %e, "busy check failed during booking");
            return BookingOutcome::rejected(RejectReason::CollaboratorUnreachable, vec![]);
        }
    };
    if busy
        .iter()
        .any(|b| slots::overlaps(start, end, b.start, b.end))
    {
        let alternatives = nearby_alternatives(
            busy_source,
            tipo,
            start.date_naive(),
            ALTERNATIVES_SCAN_DAYS,
            ALTERNATIVES_LIMIT,
        )
        .await;
        return BookingOutcome::rejected(RejectReason::SlotTaken, alternatives);
    }

    // 6. Hand the original payload to the sink and surface its verdict.
    let payload_json = match serde_json::to_value(payload) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize booking payload");
            return BookingOutcome::rejected(RejectReason::SinkFailure, vec![]);
        }
    };
    match sink.dispatch(&payload_json).await {
        Ok(resp) if resp["ok"] == true => BookingOutcome::Accepted(resp),
        Ok(resp) => {
            tracing::warn!(response = %resp, "sink declined booking");
            BookingOutcome::rejected(RejectReason::SinkFailure, vec![])
        }
        Err(e) => {
            tracing::error!(error = %e, "sink unreachable");
            BookingOutcome::rejected(RejectReason::CollaboratorUnreachable, vec![])
        }
    }
}

/// Last bookable instant: the end of the day 15 days out.
fn end_of_horizon(now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let last_day = now.date_naive() + Duration::days(MAX_HORIZON_DAYS);
    last_day
        .and_hms_opt(23, 59, 59)
        .and_then(|naive| clinic_zone().from_local_datetime(&naive).single())
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    use crate::models::BusyInterval;

    struct FakeBusy {
        busy: Vec<BusyInterval>,
        fail: bool,
    }

    impl FakeBusy {
        fn empty() -> Self {
            Self {
                busy: vec![],
                fail: false,
            }
        }
    }

    #[async_trait]
    impl BusySource for FakeBusy {
        async fn busy_between(
            &self,
            from: DateTime<FixedOffset>,
            to: DateTime<FixedOffset>,
        ) -> anyhow::Result<Vec<BusyInterval>> {
            if self.fail {
                anyhow::bail!("calendar down");
            }
            Ok(self
                .busy
                .iter()
                .copied()
                .filter(|b| slots::overlaps(from, to, b.start, b.end))
                .collect())
        }
    }

    struct FakeSink {
        ok: bool,
        fail: bool,
        dispatched: Mutex<Vec<serde_json::Value>>,
    }

    impl FakeSink {
        fn accepting() -> Self {
            Self {
                ok: true,
                fail: false,
                dispatched: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl PersistenceSink for FakeSink {
        async fn dispatch(
            &self,
            payload: &serde_json::Value,
        ) -> anyhow::Result<serde_json::Value> {
            if self.fail {
                anyhow::bail!("webhook down");
            }
            self.dispatched.lock().unwrap().push(payload.clone());
            Ok(json!({ "ok": self.ok, "id": "evt-1" }))
        }
    }

    fn crear_cita(inicio: &str, fin: &str) -> ActionPayload {
        ActionPayload {
            action: "crear_cita".to_string(),
            data: json!({
                "nombre": "Ana López",
                "cedula": "12345678",
                "entidad_salud": "Colsanitas",
                "tipo": "Control presencial",
                "inicio": inicio,
                "fin": fin,
            }),
        }
    }

    fn now() -> DateTime<FixedOffset> {
        // Monday 2025-10-06, 07:00 local
        parse_instant("2025-10-06T07:00:00-05:00").unwrap()
    }

    fn reason_of(outcome: &BookingOutcome) -> Option<RejectReason> {
        match outcome {
            BookingOutcome::Rejected { reason, .. } => Some(*reason),
            BookingOutcome::Accepted(_) => None,
        }
    }

    fn alternatives_of(outcome: &BookingOutcome) -> &[crate::models::Alternative] {
        match outcome {
            BookingOutcome::Rejected { alternatives, .. } => alternatives,
            BookingOutcome::Accepted(_) => &[],
        }
    }

    #[tokio::test]
    async fn test_accepts_valid_monday_morning() {
        let busy = FakeBusy::empty();
        let sink = FakeSink::accepting();
        let payload = crear_cita("2025-10-06T09:00:00-05:00", "2025-10-06T09:15:00-05:00");

        let outcome = validate_booking(&busy, &sink, &payload, now()).await;
        assert!(outcome.is_accepted(), "got {:?}", outcome);

        // The sink received the payload verbatim
        let dispatched = sink.dispatched.lock().unwrap();
        assert_eq!(dispatched.len(), 1);
        assert_eq!(dispatched[0]["action"], "crear_cita");
        assert_eq!(dispatched[0]["data"]["nombre"], "Ana López");
    }

    #[tokio::test]
    async fn test_rejects_unparseable_time_without_alternatives() {
        let busy = FakeBusy::empty();
        let sink = FakeSink::accepting();
        let payload = crear_cita("mañana temprano", "2025-10-06T09:15:00-05:00");

        let outcome = validate_booking(&busy, &sink, &payload, now()).await;
        assert_eq!(reason_of(&outcome), Some(RejectReason::InvalidTime));
        assert!(alternatives_of(&outcome).is_empty());
    }

    #[tokio::test]
    async fn test_rejects_inverted_interval() {
        let busy = FakeBusy::empty();
        let sink = FakeSink::accepting();
        let payload = crear_cita("2025-10-06T09:15:00-05:00", "2025-10-06T09:00:00-05:00");

        let outcome = validate_booking(&busy, &sink, &payload, now()).await;
        assert_eq!(reason_of(&outcome), Some(RejectReason::InvalidTime));
    }

    #[tokio::test]
    async fn test_rejects_past_time_with_alternatives() {
        let busy = FakeBusy::empty();
        let sink = FakeSink::accepting();
        // Friday before "now", inside a valid window at the time
        let payload = crear_cita("2025-10-03T08:00:00-05:00", "2025-10-03T08:15:00-05:00");

        let outcome = validate_booking(&busy, &sink, &payload, now()).await;
        assert_eq!(reason_of(&outcome), Some(RejectReason::PastTime));
        let alts = alternatives_of(&outcome);
        assert!(!alts.is_empty() && alts.len() <= 6);
        // Every alternative is genuinely in the future
        assert!(alts.iter().all(|a| a.inicio >= now()));
        assert!(sink.dispatched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_beyond_horizon() {
        let busy = FakeBusy::empty();
        let sink = FakeSink::accepting();
        // A Monday a month out
        let payload = crear_cita("2025-11-03T09:00:00-05:00", "2025-11-03T09:15:00-05:00");

        let outcome = validate_booking(&busy, &sink, &payload, now()).await;
        assert_eq!(reason_of(&outcome), Some(RejectReason::BeyondHorizon));
        assert!(alternatives_of(&outcome).len() <= 6);
    }

    #[tokio::test]
    async fn test_horizon_end_of_last_day_is_bookable_in_principle() {
        let busy = FakeBusy::empty();
        let sink = FakeSink::accepting();
        // Day 15 out from 2025-10-06 is Tuesday 2025-10-21: inside the
        // horizon, so the window rule is what rejects it, not the horizon.
        let payload = crear_cita("2025-10-21T09:00:00-05:00", "2025-10-21T09:15:00-05:00");

        let outcome = validate_booking(&busy, &sink, &payload, now()).await;
        assert_eq!(reason_of(&outcome), Some(RejectReason::OutsideWindow));
    }

    #[tokio::test]
    async fn test_rejects_tuesday_as_outside_window() {
        let busy = FakeBusy::empty();
        let sink = FakeSink::accepting();
        let payload = crear_cita("2025-10-07T09:00:00-05:00", "2025-10-07T09:15:00-05:00");

        let outcome = validate_booking(&busy, &sink, &payload, now()).await;
        assert_eq!(reason_of(&outcome), Some(RejectReason::OutsideWindow));
        let alts = alternatives_of(&outcome);
        assert!(!alts.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_spill_past_window_end() {
        let busy = FakeBusy::empty();
        let sink = FakeSink::accepting();
        // 11:20 + 15min crosses the 11:30 morning end
        let payload = crear_cita("2025-10-06T11:20:00-05:00", "2025-10-06T11:35:00-05:00");

        let outcome = validate_booking(&busy, &sink, &payload, now()).await;
        assert_eq!(reason_of(&outcome), Some(RejectReason::OutsideWindow));
    }

    #[tokio::test]
    async fn test_rejects_taken_slot() {
        let busy = FakeBusy {
            busy: vec![BusyInterval {
                start: parse_instant("2025-10-06T09:00:00-05:00").unwrap(),
                end: parse_instant("2025-10-06T09:30:00-05:00").unwrap(),
            }],
            fail: false,
        };
        let sink = FakeSink::accepting();
        let payload = crear_cita("2025-10-06T09:00:00-05:00", "2025-10-06T09:15:00-05:00");

        let outcome = validate_booking(&busy, &sink, &payload, now()).await;
        assert_eq!(reason_of(&outcome), Some(RejectReason::SlotTaken));
        assert!(sink.dispatched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_adjacent_busy_does_not_block() {
        // Busy ends exactly at the requested start
        let busy = FakeBusy {
            busy: vec![BusyInterval {
                start: parse_instant("2025-10-06T08:45:00-05:00").unwrap(),
                end: parse_instant("2025-10-06T09:00:00-05:00").unwrap(),
            }],
            fail: false,
        };
        let sink = FakeSink::accepting();
        let payload = crear_cita("2025-10-06T09:00:00-05:00", "2025-10-06T09:15:00-05:00");

        let outcome = validate_booking(&busy, &sink, &payload, now()).await;
        assert!(outcome.is_accepted());
    }

    #[tokio::test]
    async fn test_busy_failure_never_approves() {
        let busy = FakeBusy {
            busy: vec![],
            fail: true,
        };
        let sink = FakeSink::accepting();
        let payload = crear_cita("2025-10-06T09:00:00-05:00", "2025-10-06T09:15:00-05:00");

        let outcome = validate_booking(&busy, &sink, &payload, now()).await;
        assert_eq!(
            reason_of(&outcome),
            Some(RejectReason::CollaboratorUnreachable)
        );
        assert!(sink.dispatched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sink_decline_surfaces_as_sink_failure() {
        let busy = FakeBusy::empty();
        let sink = FakeSink {
            ok: false,
            fail: false,
            dispatched: Mutex::new(vec![]),
        };
        let payload = crear_cita("2025-10-06T09:00:00-05:00", "2025-10-06T09:15:00-05:00");

        let outcome = validate_booking(&busy, &sink, &payload, now()).await;
        assert_eq!(reason_of(&outcome), Some(RejectReason::SinkFailure));
    }

    #[tokio::test]
    async fn test_sink_transport_error_is_unreachable() {
        let busy = FakeBusy::empty();
        let sink = FakeSink {
            ok: true,
            fail: true,
            dispatched: Mutex::new(vec![]),
        };
        let payload = crear_cita("2025-10-06T09:00:00-05:00", "2025-10-06T09:15:00-05:00");

        let outcome = validate_booking(&busy, &sink, &payload, now()).await;
        assert_eq!(
            reason_of(&outcome),
            Some(RejectReason::CollaboratorUnreachable)
        );
    }
}
