//! Calendar provider integration
//!
//! Wire shapes of the provider's event payload and their mapping into cached
//! [`dagplanner_domain::CalendarEvent`] rows. Transport and authentication
//! live with the [`dagplanner_core::RemoteCalendarSource`] implementation.

pub mod mapping;
pub mod types;

pub use mapping::{map_raw_event, map_snapshot, provider_color, EventMapper};
pub use types::{RawCalendarEvent, RawEventTime};
