//! Provider event payloads

use serde::{Deserialize, Serialize};

/// Start or end of a provider event.
///
/// All-day events carry `date`; timed events carry `date_time` (RFC 3339,
/// optionally without offset when `time_zone` is given).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventTime {
    pub date: Option<String>,
    pub date_time: Option<String>,
    pub time_zone: Option<String>,
}

impl RawEventTime {
    pub fn date(date: impl Into<String>) -> Self {
        Self { date: Some(date.into()), ..Self::default() }
    }

    pub fn date_time(date_time: impl Into<String>) -> Self {
        Self { date_time: Some(date_time.into()), ..Self::default() }
    }
}

/// Event as returned by the provider's events listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCalendarEvent {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<RawEventTime>,
    pub end: Option<RawEventTime>,
    pub color_id: Option<String>,
    /// Set on instances of a recurring series
    pub recurring_event_id: Option<String>,
    pub html_link: Option<String>,
}
