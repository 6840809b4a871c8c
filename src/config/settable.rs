//! Mutable leaf config.
//!
//! Entries live behind an atomically swapped map: readers load the current
//! map without locking, writers build a new map under a short write lock and
//! publish it in one swap. Listeners fire after the lock is released.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::config::listeners::ListenerSet;
use crate::config::node::{Config, ConfigListener};
use crate::config::visitor::Visitor;
use crate::observability::metrics;
use crate::polling::source::PollContent;

/// A leaf that can be changed at runtime, either by application code or by a
/// poller applying source updates.
pub struct SettableConfig {
    name: String,
    props: ArcSwap<HashMap<String, String>>,
    write: Mutex<()>,
    version: AtomicU64,
    listeners: ListenerSet<dyn ConfigListener>,
}

impl SettableConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_props(name, HashMap::new())
    }

    pub fn with_props(name: impl Into<String>, props: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            props: ArcSwap::from_pointee(props),
            write: Mutex::new(()),
            version: AtomicU64::new(0),
            listeners: ListenerSet::new(),
        }
    }

    pub fn set_property(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        self.mutate(|props| {
            if props.get(&key) == Some(&value) {
                return false;
            }
            props.insert(key, value);
            true
        });
    }

    pub fn clear_property(&self, key: &str) {
        self.mutate(|props| props.remove(key).is_some());
    }

    /// Upsert several entries as one mutation.
    pub fn set_properties<I, K, V>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries: Vec<(String, String)> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.mutate(|props| {
            let mut changed = false;
            for (key, value) in entries {
                if props.get(&key) != Some(&value) {
                    props.insert(key, value);
                    changed = true;
                }
            }
            changed
        });
    }

    /// Apply a source update. Returns true if anything changed.
    pub fn apply(&self, content: PollContent) -> bool {
        match content {
            PollContent::Unchanged => false,
            PollContent::Snapshot(snapshot) => self.mutate(|props| {
                if *props == snapshot {
                    return false;
                }
                *props = snapshot;
                true
            }),
            PollContent::Delta(delta) => self.mutate(|props| {
                let mut changed = false;
                for key in &delta.removals {
                    changed |= props.remove(key).is_some();
                }
                for (key, value) in delta.upserts {
                    if props.get(&key) != Some(&value) {
                        props.insert(key, value);
                        changed = true;
                    }
                }
                changed
            }),
        }
    }

    /// Current entries as an owned map.
    pub fn snapshot(&self) -> HashMap<String, String> {
        HashMap::clone(&self.props.load())
    }

    fn mutate<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut HashMap<String, String>) -> bool,
    {
        let changed = {
            let _guard = self.write.lock().unwrap_or_else(PoisonError::into_inner);
            let mut next = HashMap::clone(&self.props.load());
            if f(&mut next) {
                self.props.store(Arc::new(next));
                self.version.fetch_add(1, Ordering::AcqRel);
                true
            } else {
                false
            }
        };

        if changed {
            let version = self.version.load(Ordering::Acquire);
            tracing::debug!(config = %self.name, version, "Settable config updated");
            metrics::record_tree_version(&self.name, version);
            for listener in self.listeners.snapshot().iter() {
                listener.on_config_updated(self);
            }
        }
        changed
    }
}

impl std::fmt::Debug for SettableConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettableConfig")
            .field("name", &self.name)
            .field("version", &self.version())
            .finish()
    }
}

impl Config for SettableConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        self.props.load().get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.props.load().keys().cloned().collect()
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        let props = self.props.load_full();
        let sorted: BTreeMap<_, _> = props.iter().collect();
        for (key, value) in sorted {
            visitor.visit_property(key, value);
        }
    }

    fn add_listener(&self, listener: Arc<dyn ConfigListener>) {
        self.listeners.add(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn ConfigListener>) {
        self.listeners.remove(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polling::source::Delta;
    use std::sync::atomic::AtomicUsize;

    struct Counter(AtomicUsize);

    impl ConfigListener for Counter {
        fn on_config_updated(&self, _config: &dyn Config) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_set_and_clear_bump_version() {
        let config = SettableConfig::new("runtime");
        assert_eq!(config.version(), 0);

        config.set_property("foo", "1");
        assert_eq!(config.get_raw("foo").as_deref(), Some("1"));
        assert_eq!(config.version(), 1);

        // Same value is not a mutation
        config.set_property("foo", "1");
        assert_eq!(config.version(), 1);

        config.clear_property("foo");
        assert!(config.get_raw("foo").is_none());
        assert_eq!(config.version(), 2);

        config.clear_property("foo");
        assert_eq!(config.version(), 2);
    }

    #[test]
    fn test_listeners_fire_once_per_change() {
        let config = SettableConfig::new("runtime");
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let listener: Arc<dyn ConfigListener> = counter.clone();
        config.add_listener(listener.clone());

        config.set_properties([("a", "1"), ("b", "2")]);
        config.set_property("a", "1");
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        config.remove_listener(&listener);
        config.set_property("a", "3");
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_apply_snapshot_and_delta() {
        let config = SettableConfig::new("remote");
        config.set_property("stale", "x");

        let snapshot = HashMap::from([("a".to_string(), "1".to_string())]);
        assert!(config.apply(PollContent::Snapshot(snapshot.clone())));
        assert!(config.get_raw("stale").is_none());
        assert!(!config.apply(PollContent::Snapshot(snapshot)));

        let delta = Delta {
            upserts: HashMap::from([("b".to_string(), "2".to_string())]),
            removals: vec!["a".to_string()],
        };
        assert!(config.apply(PollContent::Delta(delta)));
        assert!(config.get_raw("a").is_none());
        assert_eq!(config.get_raw("b").as_deref(), Some("2"));
        assert!(!config.apply(PollContent::Unchanged));
    }
}
