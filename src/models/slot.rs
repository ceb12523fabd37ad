use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// One bookable interval on one calendar day for one appointment type.
/// Invariant: end > start (the window rules never emit anything else).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// A fixed-duration candidate interval tiled inside a window. Serialized
/// with the Spanish wire names the assistant and the sink expect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    #[serde(rename = "inicio")]
    pub start: DateTime<FixedOffset>,
    #[serde(rename = "fin")]
    pub end: DateTime<FixedOffset>,
}

/// An occupied interval reported by the external calendar. Opaque to us;
/// intervals may overlap each other arbitrarily.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusyInterval {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// Free capacity found on a single scanned day. `ejemplos` carries the
/// first few start times as HH:MM for compact chat replies.
#[derive(Debug, Clone, Serialize)]
pub struct DayAvailability {
    pub fecha: NaiveDate,
    pub duracion_min: i64,
    pub total: usize,
    pub ejemplos: Vec<String>,
    pub slots: Vec<Slot>,
}
