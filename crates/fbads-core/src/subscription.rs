//! Callback sets and unsubscribe handles
//!
//! Callbacks are identified by `Arc` identity. Registering the same `Arc`
//! twice stores it once; removal requires an `Arc` pointing at the same
//! allocation. Iteration order is insertion order.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::utils::lock;

/// Insertion-ordered set of callbacks keyed by `Arc` identity
pub struct CallbackSet<F: ?Sized> {
    entries: Vec<Arc<F>>,
}

impl<F: ?Sized> CallbackSet<F> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add `callback`; returns `false` if it was already present
    pub fn insert(&mut self, callback: Arc<F>) -> bool {
        if self.contains(&callback) {
            return false;
        }
        self.entries.push(callback);
        true
    }

    /// Remove `callback`; returns `false` if it was not present
    pub fn remove(&mut self, callback: &Arc<F>) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| !same_callback(entry, callback));
        self.entries.len() != before
    }

    pub fn contains(&self, callback: &Arc<F>) -> bool {
        self.entries.iter().any(|entry| same_callback(entry, callback))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Copy of the current members, for invoking without holding a lock
    pub fn snapshot(&self) -> Vec<Arc<F>> {
        self.entries.clone()
    }
}

impl<F: ?Sized> Default for CallbackSet<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> fmt::Debug for CallbackSet<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSet")
            .field("len", &self.entries.len())
            .finish()
    }
}

fn same_callback<F: ?Sized>(a: &Arc<F>, b: &Arc<F>) -> bool {
    // Compare data pointers only; vtable pointers for the same closure may differ.
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Handle returned by every `on_*`/`subscribe` operation
///
/// [`Subscription::remove`] detaches the callback and may be called any
/// number of times. Dropping the handle does *not* unsubscribe.
pub struct Subscription {
    remove: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    pub(crate) fn new<F>(remove: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            remove: Mutex::new(Some(Box::new(remove))),
        }
    }

    /// A handle with nothing to remove
    pub fn noop() -> Self {
        Self {
            remove: Mutex::new(None),
        }
    }

    /// Detach the callback
    pub fn remove(&self) {
        let remove = lock(&self.remove).take();
        if let Some(remove) = remove {
            remove();
        }
    }

    /// Whether [`Subscription::remove`] still has work to do
    pub fn is_active(&self) -> bool {
        lock(&self.remove).is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
