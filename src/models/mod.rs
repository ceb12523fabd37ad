pub mod appointment;
pub mod conversation;
pub mod intent;
pub mod outcome;
pub mod slot;

pub use appointment::AppointmentType;
pub use conversation::{ConversationMessage, Session};
pub use intent::{Action, ActionPayload, BookingRequest, DayQuery, RangeQuery};
pub use outcome::{Alternative, BookingOutcome, RejectReason};
pub use slot::{BusyInterval, DayAvailability, Slot, TimeWindow};
