use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::state::State;

/// A subscriber is a plain function from the new state to nothing. Kept as
/// an `Arc` so `unregister` can compare by pointer identity rather than
/// requiring `PartialEq` on closures.
pub type Subscriber = Arc<dyn Fn(&State) + Send + Sync>;

/// Fans out state-change notifications to registered subscribers (§4.5).
///
/// The subscriber list lives behind a `parking_lot::Mutex` that is only ever
/// held for the duration of a `Vec` clone. The actual notification loop
/// runs over a snapshot outside the lock, so a subscriber that registers or
/// unregisters from within its own callback can't deadlock the publisher or
/// corrupt the list it's iterating.
pub struct Publisher {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl Publisher {
    pub fn new() -> Self {
        Publisher { subscribers: Mutex::new(Vec::new()) }
    }

    /// Idempotent: registering the same subscriber (by pointer identity)
    /// twice is a no-op.
    pub fn register(&self, subscriber: Subscriber) {
        let mut subscribers = self.subscribers.lock();
        if !subscribers.iter().any(|s| Arc::ptr_eq(s, &subscriber)) {
            subscribers.push(subscriber);
        }
    }

    /// Unregistering a subscriber that was never registered is a silent
    /// no-op.
    pub fn unregister(&self, subscriber: &Subscriber) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|s| !Arc::ptr_eq(s, subscriber));
    }

    /// Invokes each subscriber, in registration order, with the new state. A
    /// subscriber that panics is caught and logged; the rest still run.
    pub async fn notify(&self, state: &State) {
        let snapshot: Vec<Subscriber> = self.subscribers.lock().clone();
        for subscriber in snapshot {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| subscriber(state)));
            if let Err(_panic) = result {
                log::error!("subscriber panicked while handling state change to {}", state.name());
            }
        }
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Publisher::new()
    }
}
