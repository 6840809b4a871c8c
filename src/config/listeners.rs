//! Copy-on-write listener lists.
//!
//! Writers replace the whole list; notification passes iterate an immutable
//! snapshot, so a listener may add or remove listeners while being invoked.

use std::sync::Arc;
use arc_swap::ArcSwap;

/// A set of listeners shared between registering code and notifying code.
pub struct ListenerSet<L: ?Sized> {
    inner: ArcSwap<Vec<Arc<L>>>,
}

impl<L: ?Sized> ListenerSet<L> {
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Register a listener. Registering the same `Arc` twice is a no-op.
    pub fn add(&self, listener: Arc<L>) {
        self.inner.rcu(|current| {
            let mut next = Vec::clone(current);
            if !next.iter().any(|l| Arc::ptr_eq(l, &listener)) {
                next.push(listener.clone());
            }
            next
        });
    }

    /// Remove a listener by identity. Returns true if it was registered.
    pub fn remove(&self, listener: &Arc<L>) -> bool {
        let mut removed = false;
        self.inner.rcu(|current| {
            let next: Vec<Arc<L>> = current
                .iter()
                .filter(|l| !Arc::ptr_eq(l, listener))
                .cloned()
                .collect();
            removed = next.len() != current.len();
            next
        });
        removed
    }

    /// The listeners registered right now.
    pub fn snapshot(&self) -> Arc<Vec<Arc<L>>> {
        self.inner.load_full()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.load().len()
    }
}

impl<L: ?Sized> Default for ListenerSet<L> {
    fn default() -> Self {
        Self::new()
    }
}
