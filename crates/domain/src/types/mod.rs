//! Domain types and models
//!
//! The calendar cache revolves around a single normalized entity,
//! [`CalendarEvent`], grouped into partitions by `calendar_id`.

pub mod calendar;
pub mod event;
pub mod query;

pub use calendar::RemoteCalendar;
pub use event::CalendarEvent;
pub use query::{DateRange, RangeQuery};
