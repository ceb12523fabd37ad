use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Weekday};

use crate::models::{AppointmentType, TimeWindow};
use crate::services::scheduling::clinic_zone;

/// Bookable windows for one calendar day and appointment type.
///
/// Hard rules of the practice:
/// - Tuesday, Saturday, Sunday: closed, every type.
/// - Monday: 08:00-11:30 and 14:00-17:30, in-person only.
/// - Wednesday/Thursday: 14:00-16:30, in-person only.
/// - Friday: 08:00-11:30 in-person; 14:00-17:30 is the only virtual window
///   of the week.
pub fn windows_for(date: NaiveDate, tipo: AppointmentType) -> Vec<TimeWindow> {
    let mut windows = Vec::new();

    match date.weekday() {
        Weekday::Tue | Weekday::Sat | Weekday::Sun => {}
        Weekday::Mon => {
            if !tipo.is_virtual() {
                windows.extend(window(date, (8, 0), (11, 30)));
                windows.extend(window(date, (14, 0), (17, 30)));
            }
        }
        Weekday::Wed | Weekday::Thu => {
            if !tipo.is_virtual() {
                windows.extend(window(date, (14, 0), (16, 30)));
            }
        }
        Weekday::Fri => {
            if tipo.is_virtual() {
                windows.extend(window(date, (14, 0), (17, 30)));
            } else {
                windows.extend(window(date, (8, 0), (11, 30)));
            }
        }
    }

    windows
}

fn window(date: NaiveDate, start: (u32, u32), end: (u32, u32)) -> Option<TimeWindow> {
    let start = at(date, start.0, start.1)?;
    let end = at(date, end.0, end.1)?;
    (end > start).then_some(TimeWindow { start, end })
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<FixedOffset>> {
    let naive = date.and_hms_opt(hour, minute, 0)?;
    clinic_zone().from_local_datetime(&naive).single()
}
