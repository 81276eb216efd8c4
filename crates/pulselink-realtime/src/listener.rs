//! Insertion-ordered listener registry.
//!
//! Every parsed inbound message is fanned out to each registered callback in
//! registration order. A panicking callback is isolated so the remaining
//! listeners still receive the message.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::warn;

type Callback = Arc<dyn Fn(&serde_json::Value) + Send + Sync + 'static>;

struct Entry {
    id: u64,
    callback: Callback,
}

/// Shared registry of message callbacks. Cloned between the public handle
/// and the connection task.
#[derive(Clone)]
pub(crate) struct ListenerSet {
    entries: Arc<Mutex<Vec<Entry>>>,
    next_id: Arc<AtomicU64>,
}

impl ListenerSet {
    pub(crate) fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a callback, returning a handle that can unregister it.
    /// Dropping the handle leaves the listener registered.
    pub(crate) fn register<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push(Entry {
            id,
            callback: Arc::new(callback),
        });
        ListenerHandle {
            id,
            entries: Arc::downgrade(&self.entries),
        }
    }

    /// Deliver a message to every listener in registration order.
    pub(crate) fn dispatch(&self, message: &serde_json::Value) {
        // Snapshot outside the lock so a callback may register or
        // unregister listeners without deadlocking.
        let snapshot: Vec<(u64, Callback)> = self
            .lock()
            .iter()
            .map(|e| (e.id, Arc::clone(&e.callback)))
            .collect();

        for (id, callback) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(message))).is_err() {
                warn!(listener = id, "message listener panicked");
            }
        }
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Unregistration handle returned by `on_message`.
pub struct ListenerHandle {
    id: u64,
    entries: Weak<Mutex<Vec<Entry>>>,
}

impl ListenerHandle {
    /// Remove the listener this handle was created for.
    pub fn unregister(self) {
        if let Some(entries) = self.entries.upgrade() {
            let mut guard = match entries.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.retain(|e| e.id != self.id);
        }
    }
}
