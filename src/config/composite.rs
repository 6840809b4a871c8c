//! Ordered overlay of child configs.
//!
//! # Resolution
//! Children are scanned in priority order and the first child holding a key
//! wins. Nested composites resolve internally, so from the parent's point of
//! view they behave as a single layer. Nothing is cached here; every lookup
//! walks the current child list.
//!
//! # Concurrency
//! The child list is an immutable `Vec` behind an `ArcSwap`. Lookups load
//! the list once and traverse that snapshot. Structural mutations serialize
//! on a writer lock, build a new list, and publish it with a single swap, so
//! readers see either the old list or the new one and never block on
//! traversal.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use arc_swap::ArcSwap;

use crate::config::error::ConfigError;
use crate::config::listeners::ListenerSet;
use crate::config::node::{Config, ConfigListener, Resolution};
use crate::config::visitor::Visitor;
use crate::observability::metrics;

#[derive(Clone)]
struct Child {
    name: String,
    config: Arc<dyn Config>,
    forwarder: Arc<dyn ConfigListener>,
}

/// Re-publishes child updates as updates of the owning composite.
struct ChildForwarder {
    parent: Weak<CompositeInner>,
}

impl ConfigListener for ChildForwarder {
    fn on_config_updated(&self, _config: &dyn Config) {
        if let Some(parent) = self.parent.upgrade() {
            parent.changed();
        }
    }
}

struct CompositeInner {
    name: String,
    children: ArcSwap<Vec<Child>>,
    write: Mutex<()>,
    version: AtomicU64,
    listeners: ListenerSet<dyn ConfigListener>,
}

impl CompositeInner {
    fn changed(self: &Arc<Self>) {
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        metrics::record_tree_version(&self.name, version);
        let view = CompositeConfig { inner: self.clone() };
        for listener in self.listeners.snapshot().iter() {
            listener.on_config_updated(&view);
        }
    }
}

/// A config that overlays an ordered list of named children.
///
/// Cloning yields another handle to the same composite.
#[derive(Clone)]
pub struct CompositeConfig {
    inner: Arc<CompositeInner>,
}

impl CompositeConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(CompositeInner {
                name: name.into(),
                children: ArcSwap::from_pointee(Vec::new()),
                write: Mutex::new(()),
                version: AtomicU64::new(0),
                listeners: ListenerSet::new(),
            }),
        }
    }

    /// Insert `config` ahead of every existing child.
    pub fn add_first(&self, name: impl Into<String>, config: Arc<dyn Config>) {
        self.insert(name.into(), config, |children, child| children.insert(0, child));
    }

    /// Append `config` behind every existing child.
    pub fn add_last(&self, name: impl Into<String>, config: Arc<dyn Config>) {
        self.insert(name.into(), config, |children, child| children.push(child));
    }

    /// Append `config` unless a child with the same name is already present.
    pub fn add_unique(
        &self,
        name: impl Into<String>,
        config: Arc<dyn Config>,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        let guard = self.inner.write.lock().unwrap_or_else(PoisonError::into_inner);
        if self.inner.children.load().iter().any(|c| c.name == name) {
            return Err(ConfigError::AlreadyExists {
                name,
                parent: self.inner.name.clone(),
            });
        }
        self.insert_locked(guard, name, config, |children, child| children.push(child));
        Ok(())
    }

    /// Remove the highest-priority child called `name`.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn Config>> {
        let removed = {
            let _guard = self.inner.write.lock().unwrap_or_else(PoisonError::into_inner);
            let current = self.inner.children.load_full();
            let index = current.iter().position(|c| c.name == name)?;
            let mut next = Vec::clone(&current);
            let child = next.remove(index);
            self.inner.children.store(Arc::new(next));
            child
        };

        removed.config.remove_listener(&removed.forwarder);
        tracing::debug!(composite = %self.inner.name, child = %name, "Removed child config");
        self.inner.changed();
        Some(removed.config)
    }

    /// Child names in priority order.
    pub fn child_names(&self) -> Vec<String> {
        self.inner.children.load().iter().map(|c| c.name.clone()).collect()
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<Arc<dyn Config>> {
        self.inner
            .children
            .load()
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.config.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.children.load().len()
    }

    /// Every leaf defining `key`, winner first.
    pub fn explain(&self, key: &str) -> Vec<Resolution> {
        let mut walker = DefinitionWalker {
            key,
            depth: 0,
            found: Vec::new(),
        };
        self.accept(&mut walker);
        walker.found
    }

    fn insert<F>(&self, name: String, config: Arc<dyn Config>, place: F)
    where
        F: FnOnce(&mut Vec<Child>, Child),
    {
        let guard = self.inner.write.lock().unwrap_or_else(PoisonError::into_inner);
        self.insert_locked(guard, name, config, place);
    }

    fn insert_locked<F>(
        &self,
        guard: std::sync::MutexGuard<'_, ()>,
        name: String,
        config: Arc<dyn Config>,
        place: F,
    ) where
        F: FnOnce(&mut Vec<Child>, Child),
    {
        let forwarder: Arc<dyn ConfigListener> = Arc::new(ChildForwarder {
            parent: Arc::downgrade(&self.inner),
        });
        let child = Child {
            name: name.clone(),
            config: config.clone(),
            forwarder: forwarder.clone(),
        };

        let mut next = Vec::clone(&self.inner.children.load());
        place(&mut next, child);
        self.inner.children.store(Arc::new(next));
        drop(guard);

        config.add_listener(forwarder);
        tracing::debug!(composite = %self.inner.name, child = %name, "Added child config");
        self.inner.changed();
    }
}

/// Collects leaf definitions of one key in traversal (priority) order.
struct DefinitionWalker<'a> {
    key: &'a str,
    depth: usize,
    found: Vec<Resolution>,
}

impl Visitor for DefinitionWalker<'_> {
    fn visit_child(&mut self, _name: &str, child: &dyn Config) {
        self.depth += 1;
        // Leaves answer at depth 0; composites are descended by `accept`
        if let Some(res) = child.resolve(self.key) {
            if res.depth == 0 {
                self.found.push(Resolution { depth: self.depth, ..res });
            }
        }
    }

    fn leave_child(&mut self, _name: &str) {
        self.depth -= 1;
    }

    fn visit_property(&mut self, _key: &str, _value: &str) {}
}

impl std::fmt::Debug for CompositeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeConfig")
            .field("name", &self.inner.name)
            .field("children", &self.child_names())
            .field("version", &self.version())
            .finish()
    }
}

impl Config for CompositeConfig {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        let children = self.inner.children.load();
        children.iter().find_map(|c| c.config.get_raw(key))
    }

    fn keys(&self) -> Vec<String> {
        let children = self.inner.children.load();
        let mut keys = BTreeSet::new();
        for child in children.iter() {
            keys.extend(child.config.keys());
        }
        keys.into_iter().collect()
    }

    fn accept(&self, visitor: &mut dyn Visitor) {
        let children = self.inner.children.load_full();
        for child in children.iter() {
            visitor.visit_child(&child.name, &*child.config);
            child.config.accept(visitor);
            visitor.leave_child(&child.name);
        }
    }

    fn add_listener(&self, listener: Arc<dyn ConfigListener>) {
        self.inner.listeners.add(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn ConfigListener>) {
        self.inner.listeners.remove(listener);
    }

    fn resolve(&self, key: &str) -> Option<Resolution> {
        let children = self.inner.children.load();
        children.iter().find_map(|c| {
            c.config.resolve(key).map(|res| Resolution {
                depth: res.depth + 1,
                ..res
            })
        })
    }

    fn is_empty(&self) -> bool {
        let children = self.inner.children.load();
        children.iter().all(|c| c.config.is_empty())
    }
}
