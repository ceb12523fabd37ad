pub mod booking;
pub mod scanner;
pub mod slots;
pub mod windows;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone};

/// The practice runs on Bogotá civil time: fixed UTC-05:00, no DST.
pub fn clinic_zone() -> FixedOffset {
    FixedOffset::west_opt(5 * 3600).expect("UTC-5 is a valid offset")
}

pub fn now_local() -> DateTime<FixedOffset> {
    chrono::Utc::now().with_timezone(&clinic_zone())
}

/// Parses an instant in the clinic zone. Accepts RFC 3339 with offset and,
/// as a fallback, a naive `YYYY-MM-DDTHH:MM[:SS]` interpreted locally.
pub fn parse_instant(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&clinic_zone()));
    }
    let naive = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .ok()?;
    clinic_zone().from_local_datetime(&naive).single()
}

/// Pushes a past date into the future a year at a time — the assistant
/// sometimes emits a stale year for "next monday"-style requests.
/// Unparseable input falls back to today.
pub fn coerce_future_date(s: &str, today: NaiveDate) -> NaiveDate {
    let Ok(mut d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") else {
        return today;
    };
    while d < today {
        // Feb 29 has no next-year twin; sliding a year in days is close enough
        d = d.with_year(d.year() + 1).unwrap_or(d + Duration::days(365));
    }
    d
}

/// Like [`coerce_future_date`] but snaps past dates to today instead of
/// shifting the year; used for range starts.
pub fn coerce_future_or_today(s: &str, today: NaiveDate) -> NaiveDate {
    match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(d) if d >= today => d,
        _ => today,
    }
}
