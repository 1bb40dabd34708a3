//! Application constants
//!
//! Centralized location for domain-level constants shared by the store, the
//! change notifier and the sync layer.

/// Logical table holding every cached calendar event.
///
/// Live queries declare their dependency on this name and the store signals it
/// after each committed mutation.
pub const CALENDAR_EVENTS_TABLE: &str = "calendar_events";

/// Title used when the provider reports an event without a summary.
pub const UNTITLED_EVENT_TITLE: &str = "(No title)";

/// Display label used when the provider reports a calendar without a name.
pub const DEFAULT_CALENDAR_NAME: &str = "Agenda";

/// Months synced before the first day of the current month.
pub const DEFAULT_SYNC_LOOKBACK_MONTHS: u32 = 1;
/// Months synced after the first day of the current month.
pub const DEFAULT_SYNC_LOOKAHEAD_MONTHS: u32 = 3;
