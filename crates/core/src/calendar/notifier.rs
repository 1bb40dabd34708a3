//! Table-level change notification
//!
//! Writers call [`ChangeNotifier::notify`] after a commit; every registered
//! subscriber whose dependency set contains one of the invalidated tables
//! receives an [`Invalidation`] on its own queue. Registration and removal
//! share the registry lock with delivery, so a subscriber removed by
//! [`ChangeNotifier::unregister`] never receives anything afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Identifier of one registered subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// One committed change, as seen by a subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    /// Notifier generation after the change
    pub generation: u64,
    /// Tables the change touched
    pub tables: Arc<[String]>,
}

/// Handle returned by [`ChangeNotifier::register`]
#[derive(Debug)]
pub struct Registration {
    pub id: SubscriberId,
    pub receiver: mpsc::UnboundedReceiver<Invalidation>,
}

struct Subscriber {
    tables: Vec<String>,
    sender: mpsc::UnboundedSender<Invalidation>,
}

impl Subscriber {
    fn depends_on(&self, tables: &[String]) -> bool {
        self.tables.iter().any(|t| tables.contains(t))
    }
}

/// Registry of live subscribers keyed by the tables they depend on
pub struct ChangeNotifier {
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
    generation: AtomicU64,
    next_id: AtomicU64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a subscriber interested in `tables`.
    pub fn register(&self, tables: &[&str]) -> Registration {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();
        let subscriber =
            Subscriber { tables: tables.iter().map(|t| (*t).to_string()).collect(), sender };

        self.subscribers.lock().insert(id, subscriber);
        debug!(subscriber_id = %id, ?tables, "registered change subscriber");

        Registration { id, receiver }
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    ///
    /// Once this returns, the subscriber's queue receives nothing further and
    /// is closed.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.lock().remove(&id).is_some();
        if removed {
            debug!(subscriber_id = %id, "unregistered change subscriber");
        }
        removed
    }

    /// Signal that `tables` changed. Returns the new generation.
    ///
    /// The generation is bumped under the registry lock, so every subscriber
    /// sees invalidations in generation order.
    pub fn notify(&self, tables: &[&str]) -> u64 {
        let tables: Arc<[String]> = tables.iter().map(|t| (*t).to_string()).collect();
        let mut subscribers = self.subscribers.lock();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let invalidation = Invalidation { generation, tables: Arc::clone(&tables) };

        let mut closed = Vec::new();
        let mut delivered = 0usize;
        for (id, subscriber) in subscribers.iter() {
            if !subscriber.depends_on(&tables) {
                continue;
            }
            if subscriber.sender.send(invalidation.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(*id);
            }
        }
        for id in closed {
            subscribers.remove(&id);
        }

        trace!(generation, delivered, tables = ?tables, "delivered invalidation");
        generation
    }

    /// Generation of the most recent notification, 0 before the first.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("generation", &self.generation())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
