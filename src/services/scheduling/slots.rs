use chrono::{DateTime, Duration, FixedOffset, NaiveDate};

use crate::models::{AppointmentType, BusyInterval, Slot, TimeWindow};
use crate::services::scheduling::windows::windows_for;

#[derive(Debug, Clone)]
pub struct GeneratedSlots {
    pub duration_min: i64,
    pub windows: Vec<TimeWindow>,
    pub slots: Vec<Slot>,
}

/// Tiles the day's windows with back-to-back slots of the type's fixed
/// duration. Emission stops once `max_slots` slots exist; the cap bounds
/// payload size, it is not a business rule.
pub fn generate(date: NaiveDate, tipo: AppointmentType, max_slots: usize) -> GeneratedSlots {
    let windows = windows_for(date, tipo);
    let duration_min = tipo.duration_minutes();
    let step = Duration::minutes(duration_min);

    let mut slots = Vec::new();
    'outer: for win in &windows {
        let mut cursor = win.start;
        while cursor + step <= win.end {
            let end = cursor + step;
            slots.push(Slot { start: cursor, end });
            cursor = end;
            if slots.len() >= max_slots {
                break 'outer;
            }
        }
    }

    GeneratedSlots {
        duration_min,
        windows,
        slots,
    }
}

/// Half-open overlap: touching endpoints do NOT collide, so back-to-back
/// appointments are fine. Changing these comparisons changes adjacency
/// behavior across the whole engine.
pub fn overlaps(
    a_start: DateTime<FixedOffset>,
    a_end: DateTime<FixedOffset>,
    b_start: DateTime<FixedOffset>,
    b_end: DateTime<FixedOffset>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Drops every slot that overlaps any busy interval, keeping order.
pub fn filter_free(slots: Vec<Slot>, busy: &[BusyInterval]) -> Vec<Slot> {
    if busy.is_empty() {
        return slots;
    }
    slots
        .into_iter()
        .filter(|s| !busy.iter().any(|b| overlaps(s.start, s.end, b.start, b.end)))
        .collect()
}

/// True when [start, end) sits fully inside one of the day's windows for
/// that appointment type.
pub fn within_windows(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    tipo: AppointmentType,
) -> bool {
    windows_for(start.date_naive(), tipo)
        .iter()
        .any(|w| start >= w.start && end <= w.end)
}
