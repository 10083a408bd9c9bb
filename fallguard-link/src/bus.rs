//! Local event bus.
//!
//! Fans a decoded alert out to in-process subscribers. Publishing never
//! blocks: each delivery is queued on the [`MainContext`] and runs there in
//! isolation, so a panicking subscriber affects neither the publisher nor
//! the other subscribers.

use crate::context::MainContext;
use crate::protocol::Topic;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tracing::{debug, warn};

/// An object that observes bus topics.
///
/// Registered with [`LocalEventBus::subscribe_weak`]; the bus only holds a
/// weak reference, so dropping the subscriber ends delivery without an
/// explicit unsubscribe.
pub trait Subscriber<T>: Send + Sync {
    fn on_event(&self, topic: Topic, payload: &T);
}

/// Identifies one registration. Pass it to [`LocalEventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    topic: Topic,
    id: u64,
}

impl SubscriptionHandle {
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

enum Registration<T> {
    Strong(Callback<T>),
    Weak(Weak<dyn Subscriber<T>>),
}

struct Entry<T> {
    id: u64,
    registration: Registration<T>,
}

/// A typed publish/subscribe bus keyed by [`Topic`].
pub struct LocalEventBus<T> {
    context: MainContext,
    subscribers: RwLock<HashMap<Topic, Vec<Entry<T>>>>,
    next_id: AtomicU64,
}

impl<T> std::fmt::Debug for LocalEventBus<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let topics = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("LocalEventBus")
            .field("topics", &topics)
            .finish()
    }
}

impl<T> LocalEventBus<T>
where
    T: Send + Sync + 'static,
{
    /// Creates a bus that delivers on `context`.
    pub fn new(context: MainContext) -> Self {
        Self {
            context,
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a callback for `topic`.
    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> SubscriptionHandle
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.register(topic, Registration::Strong(Arc::new(callback)))
    }

    /// Registers a subscriber object by weak reference.
    pub fn subscribe_weak<S>(&self, topic: Topic, subscriber: &Arc<S>) -> SubscriptionHandle
    where
        S: Subscriber<T> + 'static,
    {
        let weak: Weak<dyn Subscriber<T>> = Arc::downgrade(subscriber) as Weak<dyn Subscriber<T>>;
        self.register(topic, Registration::Weak(weak))
    }

    fn register(&self, topic: Topic, registration: Registration<T>) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic)
            .or_default()
            .push(Entry { id, registration });
        debug!(%topic, id, "subscriber registered");
        SubscriptionHandle { topic, id }
    }

    /// Removes a registration. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = subscribers.get_mut(&handle.topic) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != handle.id);
        before != entries.len()
    }

    /// Number of live registrations for `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&topic)
            .map_or(0, |entries| {
                entries
                    .iter()
                    .filter(|entry| match &entry.registration {
                        Registration::Strong(_) => true,
                        Registration::Weak(weak) => weak.strong_count() > 0,
                    })
                    .count()
            })
    }

    /// Delivers `payload` to every current subscriber of `topic`.
    ///
    /// Returns the number of deliveries queued. Each subscriber sees the
    /// payload exactly once; ordering between subscribers is unspecified.
    pub fn publish(&self, topic: Topic, payload: T) -> usize {
        let callbacks = self.live_callbacks(topic);
        if callbacks.is_empty() {
            debug!(%topic, "published with no subscribers");
            return 0;
        }

        let payload = Arc::new(payload);
        let mut queued = 0;
        for callback in callbacks {
            let payload = payload.clone();
            let delivery = async move {
                if std::panic::catch_unwind(AssertUnwindSafe(|| callback(payload.as_ref()))).is_err() {
                    warn!(%topic, "subscriber panicked during delivery");
                }
            };
            match self.context.dispatch(delivery) {
                Ok(()) => queued += 1,
                Err(e) => warn!(%topic, "delivery dropped: {e}"),
            }
        }
        queued
    }

    /// Resolves registrations to callables, pruning dead weak entries.
    fn live_callbacks(&self, topic: Topic) -> Vec<Callback<T>> {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = subscribers.get_mut(&topic) else {
            return Vec::new();
        };

        let mut callbacks: Vec<Callback<T>> = Vec::with_capacity(entries.len());
        entries.retain(|entry| match &entry.registration {
            Registration::Strong(callback) => {
                callbacks.push(callback.clone());
                true
            }
            Registration::Weak(weak) => match weak.upgrade() {
                Some(subscriber) => {
                    callbacks.push(Arc::new(move |payload: &T| {
                        subscriber.on_event(topic, payload)
                    }));
                    true
                }
                None => {
                    debug!(%topic, id = entry.id, "pruning dropped subscriber");
                    false
                }
            },
        });
        callbacks
    }
}
