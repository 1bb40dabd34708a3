//! Date range and live query descriptors

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::event::CalendarEvent;
use crate::constants::CALENDAR_EVENTS_TABLE;
use crate::errors::{DagPlannerError, Result};

/// Inclusive date range with `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

/// Unchecked wire shape of [`DateRange`].
#[derive(Deserialize)]
struct RawDateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = DagPlannerError;

    fn try_from(raw: RawDateRange) -> Result<Self> {
        Self::new(raw.from, raw.to)
    }
}

impl DateRange {
    /// Build a range, rejecting inverted bounds.
    ///
    /// Bounds are never swapped: `from > to` is a caller error.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(DagPlannerError::InvalidRange { from, to });
        }
        Ok(Self { from, to })
    }

    /// Range covering exactly one day.
    pub fn single(date: NaiveDate) -> Self {
        Self { from: date, to: date }
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    /// Inclusive on both ends.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Descriptor of a live query over the event store.
///
/// Descriptors are plain values; subscribing twice with the same descriptor
/// yields two independent result sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeQuery {
    /// Events with `from <= start_date <= to`
    Range(DateRange),
    /// Events with `start_date == date`
    Date(NaiveDate),
}

impl RangeQuery {
    /// Range descriptor; fails with [`DagPlannerError::InvalidRange`] when
    /// `from > to`.
    pub fn range(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        DateRange::new(from, to).map(Self::Range)
    }

    pub fn date(date: NaiveDate) -> Self {
        Self::Date(date)
    }

    /// Tables whose invalidation requires re-evaluating this query.
    pub fn dependencies(&self) -> &'static [&'static str] {
        &[CALENDAR_EVENTS_TABLE]
    }

    /// Whether `event` falls inside this query's filter.
    pub fn matches(&self, event: &CalendarEvent) -> bool {
        match self {
            Self::Range(range) => range.contains(event.start_date),
            Self::Date(date) => event.start_date == *date,
        }
    }
}
