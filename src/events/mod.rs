mod event;
mod store;

pub use event::{CalendarEvent, EventTime, parse_instant};
pub use store::{EventStore, merge, retain_today};
