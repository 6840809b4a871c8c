//! Immutable leaf config backed by a map.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::config::listeners::ListenerSet;
use crate::config::node::{Config, ConfigListener};
use crate::config::visitor::Visitor;

/// A leaf whose entries are fixed at construction. Its version never moves.
pub struct MapConfig {
    name: String,
    props: HashMap<String, String>,
    listeners: ListenerSet<dyn ConfigListener>,
}

impl MapConfig {
    pub fn new(name: impl Into<String>, props: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            props,
            listeners: ListenerSet::new(),
        }
    }

    /// Build from any iterator of key/value pairs.
    pub fn from_pairs<I, K, V>(name: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let props = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(name, props)
    }

    /// Snapshot of the process environment at call time.
    pub fn from_env() -> Self {
        Self::from_pairs("environment", std::env::vars())
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }
}

impl std::fmt::Debug for MapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapConfig")
            .field("name", &self.name)
            .field("keys", &self.props.len())
            .finish()
    }
}

impl Config for MapConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> u64 {
        0
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        self.props.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.props.keys().cloned().collect()
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        let sorted: BTreeMap<_, _> = self.props.iter().collect();
        for (key, value) in sorted {
            visitor.visit_property(key, value);
        }
    }

    // Immutable: listeners are accepted but never fire.
    fn add_listener(&self, listener: Arc<dyn ConfigListener>) {
        self.listeners.add(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn ConfigListener>) {
        self.listeners.remove(listener);
    }

    fn is_empty(&self) -> bool {
        self.props.is_empty()
    }
}
