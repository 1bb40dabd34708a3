//! Calendar query service - entry point for the UI layer

use std::sync::Arc;

use chrono::NaiveDate;
use dagplanner_domain::{CalendarEvent, RangeQuery, Result};
use tracing::debug;

use super::live_query::LiveQuery;
use super::notifier::ChangeNotifier;
use super::ports::CalendarEventStore;

/// Hands out live queries bound to one store and notifier
#[derive(Clone)]
pub struct CalendarQueryService {
    store: Arc<dyn CalendarEventStore>,
    notifier: Arc<ChangeNotifier>,
}

impl CalendarQueryService {
    /// Create a new query service
    pub fn new(store: Arc<dyn CalendarEventStore>, notifier: Arc<ChangeNotifier>) -> Self {
        Self { store, notifier }
    }

    /// Observe events starting between `from` and `to`, both inclusive.
    ///
    /// # Errors
    /// [`dagplanner_domain::DagPlannerError::InvalidRange`] when `from > to`.
    pub fn observe_range(&self, from: NaiveDate, to: NaiveDate) -> Result<LiveQuery> {
        Ok(self.subscribe(RangeQuery::range(from, to)?))
    }

    /// Observe events starting on `date`.
    pub fn observe_date(&self, date: NaiveDate) -> LiveQuery {
        self.subscribe(RangeQuery::date(date))
    }

    /// Subscribe to a descriptor. The returned query is already active.
    ///
    /// Each call yields an independent subscription, even for equal
    /// descriptors. Must be called from within a Tokio runtime.
    pub fn subscribe(&self, descriptor: RangeQuery) -> LiveQuery {
        let mut query =
            LiveQuery::new(descriptor, Arc::clone(&self.store), Arc::clone(&self.notifier));
        query.activate();
        debug!(descriptor = ?descriptor, subscriber_id = ?query.subscriber_id(), "subscribed");
        query
    }

    /// Release a subscription. No snapshot is delivered to it afterwards.
    pub fn unsubscribe(&self, query: &LiveQuery) {
        query.cancel();
    }

    /// One-shot evaluation without subscribing.
    pub async fn snapshot(&self, descriptor: &RangeQuery) -> Result<Vec<CalendarEvent>> {
        self.store.query(descriptor).await
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }
}

impl std::fmt::Debug for CalendarQueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarQueryService")
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}
