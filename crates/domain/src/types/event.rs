//! Calendar event model

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// One calendar occurrence mirrored from the remote provider.
///
/// `id` is provider-assigned and globally unique across partitions;
/// `calendar_id` is the partition key. The store does not check that
/// `end_date >= start_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub calendar_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: NaiveDate,
    /// `None` for all-day events
    pub start_time: Option<NaiveTime>,
    pub end_date: NaiveDate,
    pub end_time: Option<NaiveTime>,
    pub is_all_day: bool,
    pub color_hex: Option<String>,
    pub calendar_name: String,
    /// Plain flag; recurrence rules are not expanded.
    pub is_recurring: bool,
    pub html_link: Option<String>,
}

impl CalendarEvent {
    /// Create an all-day event spanning a single date.
    pub fn all_day(
        id: impl Into<String>,
        calendar_id: impl Into<String>,
        title: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            calendar_id: calendar_id.into(),
            title: title.into(),
            description: None,
            location: None,
            start_date: date,
            start_time: None,
            end_date: date,
            end_time: None,
            is_all_day: true,
            color_hex: None,
            calendar_name: crate::constants::DEFAULT_CALENDAR_NAME.to_string(),
            is_recurring: false,
            html_link: None,
        }
    }

    /// Create a timed event that starts and ends on `date`.
    pub fn timed(
        id: impl Into<String>,
        calendar_id: impl Into<String>,
        title: impl Into<String>,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Self {
        Self {
            start_time: Some(start),
            end_time: Some(end),
            is_all_day: false,
            ..Self::all_day(id, calendar_id, title, date)
        }
    }

    /// Replace the denormalized partition label.
    #[must_use]
    pub fn with_calendar_name(mut self, name: impl Into<String>) -> Self {
        self.calendar_name = name.into();
        self
    }

    /// Set the last day of the event.
    #[must_use]
    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = end_date;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_color(mut self, color_hex: impl Into<String>) -> Self {
        self.color_hex = Some(color_hex.into());
        self
    }

    #[must_use]
    pub fn recurring(mut self, is_recurring: bool) -> Self {
        self.is_recurring = is_recurring;
        self
    }

    /// Whether the event belongs to the given partition.
    pub fn belongs_to(&self, calendar_id: &str) -> bool {
        self.calendar_id == calendar_id
    }
}
