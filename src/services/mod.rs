pub mod ai;
pub mod calendar;
pub mod conversation;
pub mod intent;
pub mod messaging;
pub mod scheduling;
pub mod sink;
