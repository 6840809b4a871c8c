//! Typed, cached, observable views of one configuration key.
//!
//! # States
//! - Uninitialized: created, never resolved
//! - Cached: holds the value resolved at some tree version
//! - Stale: the tree version moved past the cached one
//!
//! # State Transitions
//! ```text
//! Uninitialized → Cached: first access (no notification)
//! Cached → Stale: any tree mutation (all keys, conservatively)
//! Stale → Cached: next access or notifier pass re-resolves
//!     value differs   → on_change(new)
//!     decode failure  → on_parse_error(err), last good value kept
//! ```

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::config::ListenerSet;
use crate::interpolation::ConfigLookup;
use crate::observability::metrics;
use crate::property::decoder::DecodeFn;
use crate::property::error::PropertyError;
use crate::property::notifier::{self, Refresh};
use crate::property::registry::Shared;

/// Receives updates from a [`Property`].
pub trait PropertyListener<T>: Send + Sync {
    /// The handle moved to a new, successfully decoded value.
    fn on_change(&self, value: &T);

    /// An update could not be interpolated or decoded.
    fn on_parse_error(&self, _error: &PropertyError) {}
}

struct FnListener<F>(F);

impl<T, F> PropertyListener<T> for FnListener<F>
where
    F: Fn(&T) + Send + Sync,
{
    fn on_change(&self, value: &T) {
        (self.0)(value)
    }
}

struct Cached<T> {
    version: u64,
    value: T,
}

enum Transition<T> {
    None,
    Changed(T),
    Failed(PropertyError),
}

/// A live, typed property. Obtain one through
/// [`PropertyRegistry::get_property`](crate::property::PropertyRegistry::get_property).
pub struct Property<T> {
    key: String,
    default: T,
    decode: DecodeFn<T>,
    shared: Arc<Shared>,
    state: ArcSwapOption<Cached<T>>,
    listeners: ListenerSet<dyn PropertyListener<T>>,
}

impl<T> Property<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub(crate) fn new(key: String, default: T, decode: DecodeFn<T>, shared: Arc<Shared>) -> Self {
        Self {
            key,
            default,
            decode,
            shared,
            state: ArcSwapOption::empty(),
            listeners: ListenerSet::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Current value, or the default when the key is unset.
    pub fn get(&self) -> T {
        self.current()
    }

    /// Register a listener. The handle is resolved first so that the listener
    /// only hears about later transitions, and again once it is registered
    /// in case a refresh pass skipped this handle in between.
    pub fn add_listener(&self, listener: Arc<dyn PropertyListener<T>>) {
        self.current();
        self.listeners.add(listener);
        self.current();
    }

    pub fn remove_listener(&self, listener: &Arc<dyn PropertyListener<T>>) -> bool {
        self.listeners.remove(listener)
    }

    /// Register a closure as a change listener. Keep the returned `Arc` to
    /// remove it later.
    pub fn on_change<F>(&self, callback: F) -> Arc<dyn PropertyListener<T>>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let listener: Arc<dyn PropertyListener<T>> = Arc::new(FnListener(callback));
        self.add_listener(listener.clone());
        listener
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn current(&self) -> T {
        let version = self.shared.config.version();
        if let Some(cached) = &*self.state.load() {
            if cached.version >= version {
                return cached.value.clone();
            }
        }

        let guard = self.shared.locks.lock(&self.key);
        let (value, transition) = match self.state.load_full() {
            Some(cached) if cached.version >= version => (cached.value.clone(), Transition::None),
            previous => self.recompute(version, previous.as_deref()),
        };

        // Queued under the key lock so deliveries follow version order
        let inline = self
            .notification(transition)
            .and_then(|job| self.shared.enqueue(job).err());
        drop(guard);

        if let Some(job) = inline {
            job();
        }
        value
    }

    /// Caller holds this key's shard lock.
    fn recompute(&self, version: u64, previous: Option<&Cached<T>>) -> (T, Transition<T>) {
        metrics::record_property_refresh();

        match self.resolve() {
            Ok(resolved) => {
                let value = resolved.unwrap_or_else(|| self.default.clone());
                self.state.store(Some(Arc::new(Cached {
                    version,
                    value: value.clone(),
                })));
                let transition = match previous {
                    Some(prev) if prev.value != value => Transition::Changed(value.clone()),
                    _ => Transition::None,
                };
                (value, transition)
            }
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "Keeping last good property value");
                metrics::record_decode_error(err.stage());
                let value = match previous {
                    Some(prev) => prev.value.clone(),
                    None => self.default.clone(),
                };
                // Remember the failure against this version so it is reported once
                self.state.store(Some(Arc::new(Cached {
                    version,
                    value: value.clone(),
                })));
                (value, Transition::Failed(err))
            }
        }
    }

    /// Raw lookup, interpolation, then decoding. `Ok(None)` when unset.
    fn resolve(&self) -> Result<Option<T>, PropertyError> {
        let config = &*self.shared.config;
        let Some(raw) = config.get_raw(&self.key) else {
            return Ok(None);
        };
        let interpolated = self
            .shared
            .interpolator
            .resolve(&raw, &ConfigLookup(config))
            .map_err(|source| PropertyError::Interpolation {
                key: self.key.clone(),
                source,
            })?;
        (self.decode)(&interpolated)
            .map(Some)
            .map_err(|source| PropertyError::Decode {
                key: self.key.clone(),
                source,
            })
    }

    /// Listener work for a transition, if anyone is listening.
    fn notification(&self, transition: Transition<T>) -> Option<notifier::Job> {
        if matches!(transition, Transition::None) {
            return None;
        }
        let listeners = self.listeners.snapshot();
        if listeners.is_empty() {
            return None;
        }

        let key = self.key.clone();
        let job: notifier::Job = match transition {
            Transition::None => return None,
            Transition::Changed(value) => Box::new(move || {
                for listener in listeners.iter() {
                    notifier::invoke(&key, || listener.on_change(&value));
                }
            }),
            Transition::Failed(err) => Box::new(move || {
                for listener in listeners.iter() {
                    notifier::invoke(&key, || listener.on_parse_error(&err));
                }
            }),
        };
        Some(job)
    }
}

impl<T> Refresh for Property<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn refresh_observed(&self) {
        if !self.listeners.is_empty() {
            self.current();
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("key", &self.key)
            .field("default", &self.default)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
