//! Provider payload to cached event mapping

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use dagplanner_domain::constants::{DEFAULT_CALENDAR_NAME, UNTITLED_EVENT_TITLE};
use dagplanner_domain::{CalendarEvent, RemoteCalendar, Result, SyncConfig};
use tracing::{debug, warn};

use super::types::{RawCalendarEvent, RawEventTime};

/// Provider event colour palette, indexed by colour id `"1"`..`"11"`.
const EVENT_PALETTE: [&str; 11] = [
    "#7986CB", "#33B679", "#8E24AA", "#E67C73", "#F6BF26", "#F4511E", "#039BE5", "#616161",
    "#3F51B5", "#0B8043", "#D50000",
];

/// Hex colour for a provider colour id.
pub fn provider_color(color_id: &str) -> Option<&'static str> {
    let index: usize = color_id.trim().parse().ok()?;
    EVENT_PALETTE.get(index.checked_sub(1)?).copied()
}

/// Map one provider event into a row of `calendar`'s partition.
///
/// Returns `None` for events the cache can't hold: no provider id, or no
/// parseable start.
pub fn map_raw_event(
    raw: RawCalendarEvent,
    calendar: &RemoteCalendar,
    tz: Tz,
) -> Option<CalendarEvent> {
    let Some(provider_id) = raw.id.filter(|id| !id.is_empty()) else {
        debug!(calendar_id = %calendar.id, "skipping provider event without id");
        return None;
    };
    let id = format!("{}_{provider_id}", calendar.id);

    let Some(start) = raw.start.as_ref() else {
        warn!(event_id = %id, "skipping provider event without start");
        return None;
    };

    let (start_date, start_time, end_date, end_time, is_all_day) =
        if let Some(day) = start.date.as_deref() {
            let start_date = parse_date(day, &id)?;
            let end_date = raw
                .end
                .as_ref()
                .and_then(|end| end.date.as_deref())
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                .and_then(|exclusive| exclusive.checked_sub_days(Days::new(1)))
                .filter(|last| *last >= start_date)
                .unwrap_or(start_date);
            (start_date, None, end_date, None, true)
        } else {
            let (start_date, start_time) = local_date_time(start, tz, &id)?;
            let (end_date, end_time) = raw
                .end
                .as_ref()
                .and_then(|end| local_date_time(end, tz, &id))
                .unwrap_or((start_date, start_time));
            (start_date, Some(start_time), end_date, Some(end_time), false)
        };

    let title = raw
        .summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| UNTITLED_EVENT_TITLE.to_string());
    let calendar_name = if calendar.name.trim().is_empty() {
        DEFAULT_CALENDAR_NAME.to_string()
    } else {
        calendar.name.clone()
    };
    let color_hex = raw
        .color_id
        .as_deref()
        .and_then(provider_color)
        .map(str::to_string)
        .or_else(|| calendar.color_hex.clone());

    Some(CalendarEvent {
        id,
        calendar_id: calendar.id.clone(),
        title,
        description: raw.description,
        location: raw.location,
        start_date,
        start_time,
        end_date,
        end_time,
        is_all_day,
        color_hex,
        calendar_name,
        is_recurring: raw.recurring_event_id.is_some(),
        html_link: raw.html_link,
    })
}

/// Map a full provider listing, dropping events that can't be cached.
pub fn map_snapshot<I>(raws: I, calendar: &RemoteCalendar, tz: Tz) -> Vec<CalendarEvent>
where
    I: IntoIterator<Item = RawCalendarEvent>,
{
    raws.into_iter().filter_map(|raw| map_raw_event(raw, calendar, tz)).collect()
}

/// Maps provider listings into the zone configured for sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMapper {
    tz: Tz,
}

impl EventMapper {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// # Errors
    /// [`dagplanner_domain::DagPlannerError::Config`] if the configured zone
    /// is not a valid IANA name.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        config.tz().map(Self::new)
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn map_event(
        &self,
        raw: RawCalendarEvent,
        calendar: &RemoteCalendar,
    ) -> Option<CalendarEvent> {
        map_raw_event(raw, calendar, self.tz)
    }

    pub fn map_snapshot<I>(&self, raws: I, calendar: &RemoteCalendar) -> Vec<CalendarEvent>
    where
        I: IntoIterator<Item = RawCalendarEvent>,
    {
        map_snapshot(raws, calendar, self.tz)
    }
}

fn parse_date(value: &str, event_id: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| warn!(event_id, value, error = %e, "unparseable event date"))
        .ok()
}

/// Local date and wall-clock time of a timed boundary in `tz`.
fn local_date_time(time: &RawEventTime, tz: Tz, event_id: &str) -> Option<(NaiveDate, NaiveTime)> {
    let value = time.date_time.as_deref()?;

    let local = match DateTime::parse_from_rfc3339(value) {
        Ok(instant) => instant.with_timezone(&tz).naive_local(),
        Err(_) => {
            // Floating time: interpret in the event's own zone.
            let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .map_err(|e| warn!(event_id, value, error = %e, "unparseable event time"))
                .ok()?;
            let zone = time
                .time_zone
                .as_deref()
                .and_then(|name| name.parse::<Tz>().ok())
                .unwrap_or(tz);
            zone.from_local_datetime(&naive).earliest()?.with_timezone(&tz).naive_local()
        }
    };
    Some((local.date(), local.time()))
}
