use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Duration, NaiveDate};

use crate::models::{Alternative, AppointmentType, DayAvailability};
use crate::services::calendar::BusySource;
use crate::services::scheduling::slots;

/// Hard business horizon: nothing is booked further out than this.
pub const MAX_HORIZON_DAYS: i64 = 15;

/// Range scans have always been capped tighter than the horizon to bound
/// calendar traffic. The mismatch with the 15-day rule is deliberate and
/// kept until the business settles on one number.
const MAX_SCAN_DAYS: i64 = 10;

/// Upper bound on slots generated per day before reconciliation.
const DAY_SLOT_CAP: usize = 200;

/// Scans `days` days starting at `from` and reports the ones with open
/// capacity, ascending by date. Closed days and fully booked days are
/// omitted; a day whose busy query fails is logged and skipped without
/// touching the rest of the scan.
pub async fn scan(
    busy_source: &dyn BusySource,
    tipo: AppointmentType,
    from: NaiveDate,
    days: i64,
    max_slots_per_day: usize,
) -> Vec<DayAvailability> {
    let days = days.clamp(0, MAX_HORIZON_DAYS).min(MAX_SCAN_DAYS);
    let dates: Vec<NaiveDate> = (0..days).map(|i| from + Duration::days(i)).collect();

    // Three concurrent workers claim indices with a fetch_add, so each day
    // is processed by exactly one worker exactly once. The fixed worker
    // count bounds outstanding freebusy queries regardless of horizon.
    let cursor = AtomicUsize::new(0);
    let (a, b, c) = tokio::join!(
        drain(&cursor, &dates, busy_source, tipo, max_slots_per_day),
        drain(&cursor, &dates, busy_source, tipo, max_slots_per_day),
        drain(&cursor, &dates, busy_source, tipo, max_slots_per_day),
    );

    let mut out: Vec<DayAvailability> = a.into_iter().chain(b).chain(c).collect();
    out.sort_by_key(|d| d.fecha);
    out
}

async fn drain(
    cursor: &AtomicUsize,
    dates: &[NaiveDate],
    busy_source: &dyn BusySource,
    tipo: AppointmentType,
    max_slots_per_day: usize,
) -> Vec<DayAvailability> {
    let mut found = Vec::new();
    loop {
        let idx = cursor.fetch_add(1, Ordering::SeqCst);
        let Some(&date) = dates.get(idx) else {
            break;
        };
        match scan_day(busy_source, tipo, date, max_slots_per_day).await {
            Ok(Some(day)) => found.push(day),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%date, error = %e, "skipping day: busy query failed");
            }
        }
    }
    found
}

async fn scan_day(
    busy_source: &dyn BusySource,
    tipo: AppointmentType,
    date: NaiveDate,
    max_slots_per_day: usize,
) -> anyhow::Result<Option<DayAvailability>> {
    let generated = slots::generate(date, tipo, DAY_SLOT_CAP);
    let (Some(first), Some(last)) = (generated.windows.first(), generated.windows.last()) else {
        return Ok(None); // closed that day
    };

    let busy = busy_source.busy_between(first.start, last.end).await?;
    let free = slots::filter_free(generated.slots, &busy);
    if free.is_empty() {
        return Ok(None);
    }

    let ejemplos = free
        .iter()
        .take(max_slots_per_day)
        .map(|s| s.start.format("%H:%M").to_string())
        .collect();

    Ok(Some(DayAvailability {
        fecha: date,
        duracion_min: generated.duration_min,
        total: free.len(),
        ejemplos,
        slots: free.into_iter().take(max_slots_per_day).collect(),
    }))
}

/// Flattens a scan into at most `limit` alternatives, chronological by day
/// and by slot within the day. Used to soften booking rejections.
pub async fn nearby_alternatives(
    busy_source: &dyn BusySource,
    tipo: AppointmentType,
    from: NaiveDate,
    days: i64,
    limit: usize,
) -> Vec<Alternative> {
    let scanned = scan(busy_source, tipo, from, days, limit).await;
    let mut flat = Vec::new();
    'outer: for day in scanned {
        for slot in day.slots {
            flat.push(Alternative {
                fecha: day.fecha,
                inicio: slot.start,
                fin: slot.end,
                duracion_min: day.duracion_min,
            });
            if flat.len() >= limit {
                break 'outer;
            }
        }
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, FixedOffset};
    use std::sync::Mutex;

    use crate::models::BusyInterval;
    use crate::services::scheduling::parse_instant;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Busy source serving canned intervals, optionally failing for one
    /// date, and counting how many queries it saw.
    struct FakeBusy {
        busy: Vec<BusyInterval>,
        fail_on: Option<NaiveDate>,
        queries: Mutex<Vec<NaiveDate>>,
    }

    impl FakeBusy {
        fn empty() -> Self {
            Self {
                busy: vec![],
                fail_on: None,
                queries: Mutex::new(vec![]),
            }
        }

        fn with_busy(busy: Vec<BusyInterval>) -> Self {
            Self {
                busy,
                fail_on: None,
                queries: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl BusySource for FakeBusy {
        async fn busy_between(
            &self,
            from: DateTime<FixedOffset>,
            _to: DateTime<FixedOffset>,
        ) -> anyhow::Result<Vec<BusyInterval>> {
            let day = from.date_naive();
            self.queries.lock().unwrap().push(day);
            if self.fail_on == Some(day) {
                anyhow::bail!("freebusy unavailable");
            }
            Ok(self
                .busy
                .iter()
                .copied()
                .filter(|b| b.start.date_naive() == day)
                .collect())
        }
    }

    fn busy(start: &str, end: &str) -> BusyInterval {
        BusyInterval {
            start: parse_instant(start).unwrap(),
            end: parse_instant(end).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_scan_skips_closed_days() {
        let source = FakeBusy::empty();
        // Monday 2025-10-06 through Sunday
        let out = scan(
            &source,
            AppointmentType::InPersonFollowUp,
            date("2025-10-06"),
            7,
            6,
        )
        .await;
        let fechas: Vec<String> = out.iter().map(|d| d.fecha.to_string()).collect();
        assert_eq!(
            fechas,
            vec!["2025-10-06", "2025-10-08", "2025-10-09", "2025-10-10"]
        );
        // One busy query per open day, none for Tue/Sat/Sun
        assert_eq!(source.queries.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_scan_results_sorted_and_capped_per_day() {
        let source = FakeBusy::empty();
        let out = scan(
            &source,
            AppointmentType::InPersonFollowUp,
            date("2025-10-06"),
            7,
            3,
        )
        .await;
        for day in &out {
            assert!(day.slots.len() <= 3);
            assert_eq!(day.ejemplos.len(), day.slots.len());
            assert!(day.total >= day.slots.len());
            for pair in day.slots.windows(2) {
                assert!(pair[0].start < pair[1].start);
            }
        }
        for pair in out.windows(2) {
            assert!(pair[0].fecha < pair[1].fecha);
        }
    }

    #[tokio::test]
    async fn test_scan_clamps_to_ten_days() {
        let source = FakeBusy::empty();
        let from = date("2025-10-06");
        let out = scan(&source, AppointmentType::InPersonFollowUp, from, 20, 6).await;
        let limit = from + Duration::days(10);
        assert!(out.iter().all(|d| d.fecha < limit));
        // Monday start, 10 days: Mon Wed Thu Fri + Mon Wed of the next week
        assert_eq!(out.len(), 6);
    }

    #[tokio::test]
    async fn test_scan_omits_fully_booked_day() {
        // Wednesday's single window completely covered
        let source = FakeBusy::with_busy(vec![busy(
            "2025-10-08T14:00:00-05:00",
            "2025-10-08T16:30:00-05:00",
        )]);
        let out = scan(
            &source,
            AppointmentType::InPersonFollowUp,
            date("2025-10-06"),
            5,
            6,
        )
        .await;
        assert!(out.iter().all(|d| d.fecha != date("2025-10-08")));
        assert!(out.iter().any(|d| d.fecha == date("2025-10-06")));
    }

    #[tokio::test]
    async fn test_failed_day_is_skipped_not_fatal() {
        let source = FakeBusy {
            busy: vec![],
            fail_on: Some(date("2025-10-08")),
            queries: Mutex::new(vec![]),
        };
        let out = scan(
            &source,
            AppointmentType::InPersonFollowUp,
            date("2025-10-06"),
            5,
            6,
        )
        .await;
        let fechas: Vec<String> = out.iter().map(|d| d.fecha.to_string()).collect();
        assert_eq!(fechas, vec!["2025-10-06", "2025-10-09", "2025-10-10"]);
    }

    #[tokio::test]
    async fn test_each_day_queried_exactly_once() {
        let source = FakeBusy::empty();
        scan(
            &source,
            AppointmentType::InPersonFollowUp,
            date("2025-10-06"),
            10,
            6,
        )
        .await;
        let mut queried = source.queries.lock().unwrap().clone();
        let before = queried.len();
        queried.sort();
        queried.dedup();
        assert_eq!(queried.len(), before, "a day was queried twice");
    }

    #[tokio::test]
    async fn test_nearby_alternatives_flattens_chronologically() {
        let source = FakeBusy::empty();
        let alts = nearby_alternatives(
            &source,
            AppointmentType::InPersonFollowUp,
            date("2025-10-06"),
            10,
            6,
        )
        .await;
        assert_eq!(alts.len(), 6);
        // Monday has 14 in-person slots in the morning alone, so all six
        // come from the first open day.
        assert!(alts.iter().all(|a| a.fecha == date("2025-10-06")));
        for pair in alts.windows(2) {
            assert!(pair[0].inicio < pair[1].inicio);
        }
        assert!(alts.iter().all(|a| a.duracion_min == 15));
    }

    #[tokio::test]
    async fn test_nearby_alternatives_crosses_days_when_needed() {
        // Leave exactly two free slots on Monday: block everything except
        // 08:00-08:30.
        let source = FakeBusy::with_busy(vec![
            busy("2025-10-06T08:30:00-05:00", "2025-10-06T11:30:00-05:00"),
            busy("2025-10-06T14:00:00-05:00", "2025-10-06T17:30:00-05:00"),
        ]);
        let alts = nearby_alternatives(
            &source,
            AppointmentType::InPersonFollowUp,
            date("2025-10-06"),
            10,
            6,
        )
        .await;
        assert_eq!(alts.len(), 6);
        assert_eq!(alts[0].fecha, date("2025-10-06"));
        assert_eq!(alts[1].fecha, date("2025-10-06"));
        assert!(alts[2..].iter().all(|a| a.fecha == date("2025-10-08")));
    }
}
