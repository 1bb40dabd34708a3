//! Shared test helpers for `dagplanner-core` integration tests.
//!
//! In-memory implementations of the calendar ports plus small event fixtures.

#![allow(dead_code)]

pub mod calendar;

use chrono::{NaiveDate, NaiveTime};
use dagplanner_domain::CalendarEvent;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
}

/// Timed one-hour event starting at `hour`.
pub fn timed(id: &str, calendar_id: &str, day: NaiveDate, hour: u32) -> CalendarEvent {
    let title = format!("Event {id}");
    CalendarEvent::timed(id, calendar_id, title, day, time(hour, 0), time(hour + 1, 0))
}

pub fn all_day(id: &str, calendar_id: &str, day: NaiveDate) -> CalendarEvent {
    CalendarEvent::all_day(id, calendar_id, format!("Event {id}"), day)
}
