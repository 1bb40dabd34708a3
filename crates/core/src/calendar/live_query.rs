//! Live queries over the event store
//!
//! A [`LiveQuery`] moves through `Idle -> Active -> Cancelled`. While active,
//! a background evaluation task re-runs the descriptor against the store on
//! every invalidation and publishes the complete, ordered result as a new
//! [`Snapshot`]. Results are never patched; each snapshot replaces the last.
//!
//! Cancellation takes the publisher out from under the same lock the
//! evaluation task publishes through, so once `cancel` returns nothing more
//! reaches the subscriber.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dagplanner_domain::{CalendarEvent, RangeQuery, Result};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use super::notifier::{ChangeNotifier, Invalidation, SubscriberId};
use super::ports::CalendarEventStore;

/// Complete ordered result of one evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    generation: u64,
    events: Arc<[CalendarEvent]>,
}

impl Snapshot {
    pub fn new(generation: u64, events: Vec<CalendarEvent>) -> Self {
        Self { generation, events: events.into() }
    }

    /// Notifier generation the evaluation started from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.id.as_str()).collect()
    }
}

/// Observable lifecycle of a [`LiveQuery`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveQueryState {
    /// Not subscribed yet, or restarted
    Idle,
    /// Subscribed; snapshots are being produced
    Active,
    /// Released; no further snapshots
    Cancelled,
}

type Published = Option<Result<Snapshot>>;

/// One activation: the notifier registration plus the publishing side.
struct Subscription {
    id: SubscriberId,
    notifier: Arc<ChangeNotifier>,
    publisher: Mutex<Option<watch::Sender<Published>>>,
    task: Mutex<Option<AbortHandle>>,
    cancelled: AtomicBool,
}

impl Subscription {
    /// Returns `false` once the subscription has been cancelled.
    fn publish(&self, result: Result<Snapshot>) -> bool {
        let publisher = self.publisher.lock();
        match publisher.as_ref() {
            Some(sender) => {
                sender.send_replace(Some(result));
                true
            }
            None => false,
        }
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.notifier.unregister(self.id);
        self.publisher.lock().take();
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        debug!(subscriber_id = %self.id, "live query cancelled");
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct Shared {
    cancelled: AtomicBool,
    current: Mutex<Option<Arc<Subscription>>>,
}

impl Shared {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(subscription) = self.current.lock().take() {
            subscription.cancel();
        }
    }
}

/// Cloneable handle that cancels a [`LiveQuery`] from another task
#[derive(Clone)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle").field("cancelled", &self.is_cancelled()).finish()
    }
}

enum Phase {
    Idle,
    Active { subscription: Arc<Subscription>, receiver: watch::Receiver<Published> },
}

/// Standing subscription to the result of a [`RangeQuery`]
pub struct LiveQuery {
    descriptor: RangeQuery,
    store: Arc<dyn CalendarEventStore>,
    notifier: Arc<ChangeNotifier>,
    shared: Arc<Shared>,
    phase: Phase,
}

impl LiveQuery {
    /// Create an idle query; the first [`LiveQuery::next`] subscribes.
    pub fn new(
        descriptor: RangeQuery,
        store: Arc<dyn CalendarEventStore>,
        notifier: Arc<ChangeNotifier>,
    ) -> Self {
        Self { descriptor, store, notifier, shared: Arc::new(Shared::default()), phase: Phase::Idle }
    }

    pub fn descriptor(&self) -> &RangeQuery {
        &self.descriptor
    }

    pub fn state(&self) -> LiveQueryState {
        if self.shared.cancelled.load(Ordering::SeqCst) {
            return LiveQueryState::Cancelled;
        }
        match &self.phase {
            Phase::Idle => LiveQueryState::Idle,
            Phase::Active { subscription, .. } if subscription.is_cancelled() => {
                LiveQueryState::Cancelled
            }
            Phase::Active { .. } => LiveQueryState::Active,
        }
    }

    /// Subscriber id of the current activation, if any.
    pub fn subscriber_id(&self) -> Option<SubscriberId> {
        match &self.phase {
            Phase::Active { subscription, .. } => Some(subscription.id),
            Phase::Idle => None,
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle { shared: Arc::clone(&self.shared) }
    }

    /// Release the subscription. No snapshot is delivered after this returns.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// Cancel the current subscription (if any) and return to `Idle`.
    pub fn restart(&mut self) {
        if let Some(subscription) = self.shared.current.lock().take() {
            subscription.cancel();
        }
        self.phase = Phase::Idle;
        self.shared.cancelled.store(false, Ordering::SeqCst);
    }

    /// Subscribe now instead of on the first [`LiveQuery::next`].
    ///
    /// Must be called from within a Tokio runtime.
    pub fn activate(&mut self) {
        if matches!(self.phase, Phase::Idle) {
            self.start();
        }
    }

    /// Wait for the next snapshot.
    ///
    /// The first call after activation yields the initial evaluation; later
    /// calls yield the newest snapshot published since the previous call.
    /// Returns `None` once the query is cancelled.
    pub async fn next(&mut self) -> Option<Result<Snapshot>> {
        self.activate();
        let Phase::Active { subscription, receiver } = &mut self.phase else {
            return None;
        };

        loop {
            if subscription.is_cancelled() {
                return None;
            }
            if receiver.changed().await.is_err() {
                return None;
            }
            if subscription.is_cancelled() {
                return None;
            }
            if let Some(result) = receiver.borrow_and_update().clone() {
                return Some(result);
            }
        }
    }

    fn start(&mut self) {
        let mut current = self.shared.current.lock();
        if self.shared.cancelled.load(Ordering::SeqCst) {
            return;
        }

        // Register before the first evaluation so no commit slips between the
        // initial read and the subscription.
        let registration = self.notifier.register(self.descriptor.dependencies());
        let (sender, receiver) = watch::channel(None);
        let subscription = Arc::new(Subscription {
            id: registration.id,
            notifier: Arc::clone(&self.notifier),
            publisher: Mutex::new(Some(sender)),
            task: Mutex::new(None),
            cancelled: AtomicBool::new(false),
        });

        let task = tokio::spawn(evaluate(
            self.descriptor,
            Arc::clone(&self.store),
            Arc::clone(&subscription),
            registration.receiver,
        ));
        *subscription.task.lock() = Some(task.abort_handle());
        debug!(subscriber_id = %subscription.id, descriptor = ?self.descriptor, "live query active");

        *current = Some(Arc::clone(&subscription));
        drop(current);
        self.phase = Phase::Active { subscription, receiver };
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.shared.cancel();
    }
}

impl std::fmt::Debug for LiveQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQuery")
            .field("descriptor", &self.descriptor)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

async fn evaluate(
    descriptor: RangeQuery,
    store: Arc<dyn CalendarEventStore>,
    subscription: Arc<Subscription>,
    mut invalidations: mpsc::UnboundedReceiver<Invalidation>,
) {
    loop {
        let generation = subscription.notifier.generation();
        let result = store.query(&descriptor).await.map(|events| Snapshot::new(generation, events));
        if let Err(err) = &result {
            warn!(
                subscriber_id = %subscription.id,
                error = %err,
                kind = err.label(),
                "live query evaluation failed"
            );
        }
        if !subscription.publish(result) {
            break;
        }

        if invalidations.recv().await.is_none() {
            break;
        }
        // Coalesce a burst into one re-evaluation.
        while invalidations.try_recv().is_ok() {}
    }
}
