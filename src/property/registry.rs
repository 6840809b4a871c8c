//! The property registry: one shared handle per (key, type).

use std::any::{Any, TypeId};
use std::collections::BTreeSet;
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::config::{Config, ConfigListener};
use crate::interpolation::Interpolator;
use crate::property::decoder::{Decode, DecodeContext, DecodeError, DecodeFn, DecoderRegistry};
use crate::property::error::PropertyError;
use crate::property::handle::Property;
use crate::property::notifier::{self, Job, Refresh, RefreshSource, Task};
use crate::property::shard::ShardedLocks;
use crate::settings::{NotificationMode, RegistrySettings};

/// State shared by the registry and every handle it created.
pub(crate) struct Shared {
    pub(crate) config: Arc<dyn Config>,
    pub(crate) interpolator: Interpolator,
    pub(crate) locks: ShardedLocks,
    list_delimiter: String,
    notifier: Option<mpsc::UnboundedSender<Task>>,
}

impl Shared {
    /// Queue listener work on the notifier thread. Hands the job back when
    /// it must run on the caller's thread (lazy mode, or the notifier is gone).
    pub(crate) fn enqueue(&self, job: Job) -> Result<(), Job> {
        let Some(tx) = &self.notifier else {
            return Err(job);
        };
        match tx.send(Task::Deliver(job)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendError(Task::Deliver(job))) => Err(job),
            Err(mpsc::error::SendError(Task::RefreshAll)) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HandleKey {
    key: String,
    type_id: TypeId,
}

struct HandleEntry {
    handle: Arc<dyn Any + Send + Sync>,
    refresh: Arc<dyn Refresh>,
}

#[derive(Default)]
struct HandleTable {
    entries: DashMap<HandleKey, HandleEntry>,
}

impl RefreshSource for HandleTable {
    fn refreshers(&self) -> Vec<Arc<dyn Refresh>> {
        self.entries.iter().map(|e| e.value().refresh.clone()).collect()
    }
}

/// Marks every handle stale and wakes the notifier.
struct InvalidationListener {
    tx: mpsc::UnboundedSender<Task>,
}

impl ConfigListener for InvalidationListener {
    fn on_config_updated(&self, config: &dyn Config) {
        tracing::trace!(config = %config.name(), version = config.version(), "Invalidating properties");
        let _ = self.tx.send(Task::RefreshAll);
    }
}

/// Creates and caches property handles over one config tree.
///
/// Construct it once at startup and pass it by reference to the components
/// that need properties. Dropping the registry detaches it from the tree;
/// handles still held keep working in lazy fashion.
pub struct PropertyRegistry {
    shared: Arc<Shared>,
    table: Arc<HandleTable>,
    decoders: DecoderRegistry,
    invalidation: Option<Arc<dyn ConfigListener>>,
}

impl PropertyRegistry {
    pub fn new(
        config: Arc<dyn Config>,
        settings: &RegistrySettings,
        interpolator: Interpolator,
    ) -> Result<Self, PropertyError> {
        let table = Arc::new(HandleTable::default());

        let (notifier, invalidation) = match settings.notification {
            NotificationMode::Eager => {
                let weak_table: Weak<HandleTable> = Arc::downgrade(&table);
                let source: Weak<dyn RefreshSource> = weak_table;
                let tx = notifier::spawn(source)?;
                let listener: Arc<dyn ConfigListener> = Arc::new(InvalidationListener { tx: tx.clone() });
                config.add_listener(listener.clone());
                (Some(tx), Some(listener))
            }
            NotificationMode::Lazy => (None, None),
        };

        tracing::debug!(
            config = %config.name(),
            shards = settings.shard_count,
            mode = ?settings.notification,
            "Property registry created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                interpolator,
                locks: ShardedLocks::new(settings.shard_count),
                list_delimiter: settings.list_delimiter.clone(),
                notifier,
            }),
            table,
            decoders: DecoderRegistry::new(),
            invalidation,
        })
    }

    /// Registry with default settings and a failing interpolator.
    pub fn with_defaults(config: Arc<dyn Config>) -> Result<Self, PropertyError> {
        Self::new(config, &RegistrySettings::default(), Interpolator::default())
    }

    pub fn config(&self) -> &Arc<dyn Config> {
        &self.shared.config
    }

    pub fn get_property(&self, key: impl Into<String>) -> PropertyContainer<'_> {
        PropertyContainer {
            registry: self,
            key: key.into(),
        }
    }

    /// Make `T` available to [`PropertyContainer::as_custom`]. Existing
    /// handles keep the decoder they were created with.
    pub fn register_decoder<T, F>(&self, decoder: F)
    where
        T: 'static,
        F: Fn(&str) -> Result<T, DecodeError> + Send + Sync + 'static,
    {
        self.decoders.register(decoder);
    }

    /// Force a re-resolution pass over every handle with listeners.
    pub fn refresh(&self) {
        match &self.shared.notifier {
            Some(tx) if tx.send(Task::RefreshAll).is_ok() => {}
            _ => {
                for handle in self.table.refreshers() {
                    handle.refresh_observed();
                }
            }
        }
    }

    /// Number of distinct handles created so far.
    pub fn len(&self) -> usize {
        self.table.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.entries.is_empty()
    }

    fn handle<T, F>(&self, key: String, default: T, make_decoder: F) -> Arc<Property<T>>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: FnOnce() -> DecodeFn<T>,
    {
        let handle_key = HandleKey {
            key,
            type_id: TypeId::of::<T>(),
        };

        let existing = self.table.entries.get(&handle_key).map(|e| e.handle.clone());
        let erased = match existing {
            Some(handle) => handle,
            None => {
                let key = handle_key.key.clone();
                self.table
                    .entries
                    .entry(handle_key)
                    .or_insert_with(|| {
                        let property = Arc::new(Property::new(
                            key,
                            default,
                            make_decoder(),
                            self.shared.clone(),
                        ));
                        HandleEntry {
                            handle: property.clone(),
                            refresh: property,
                        }
                    })
                    .handle
                    .clone()
            }
        };

        let property = erased
            .downcast::<Property<T>>()
            .expect("handle table is keyed by TypeId");
        // Uninitialized → Cached happens outside the table's locks
        property.get();
        property
    }

    fn builtin<T: Decode>(&self, key: String, default: T) -> Arc<Property<T>> {
        let delimiter = self.shared.list_delimiter.clone();
        self.handle(key, default, move || -> DecodeFn<T> {
            Arc::new(move |raw: &str| {
                T::decode(
                    raw,
                    &DecodeContext {
                        list_delimiter: &delimiter,
                    },
                )
            })
        })
    }
}

impl Drop for PropertyRegistry {
    fn drop(&mut self) {
        if let Some(listener) = &self.invalidation {
            self.shared.config.remove_listener(listener);
        }
    }
}

impl std::fmt::Debug for PropertyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyRegistry")
            .field("config", &self.shared.config.name())
            .field("handles", &self.len())
            .field("eager", &self.shared.notifier.is_some())
            .finish()
    }
}

/// Typed accessors for one key.
pub struct PropertyContainer<'a> {
    registry: &'a PropertyRegistry,
    key: String,
}

impl PropertyContainer<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn as_string(self, default: impl Into<String>) -> Arc<Property<String>> {
        self.as_type(default.into())
    }

    pub fn as_boolean(self, default: bool) -> Arc<Property<bool>> {
        self.as_type(default)
    }

    pub fn as_byte(self, default: i8) -> Arc<Property<i8>> {
        self.as_type(default)
    }

    pub fn as_short(self, default: i16) -> Arc<Property<i16>> {
        self.as_type(default)
    }

    pub fn as_integer(self, default: i32) -> Arc<Property<i32>> {
        self.as_type(default)
    }

    pub fn as_long(self, default: i64) -> Arc<Property<i64>> {
        self.as_type(default)
    }

    pub fn as_unsigned(self, default: u64) -> Arc<Property<u64>> {
        self.as_type(default)
    }

    pub fn as_float(self, default: f32) -> Arc<Property<f32>> {
        self.as_type(default)
    }

    pub fn as_double(self, default: f64) -> Arc<Property<f64>> {
        self.as_type(default)
    }

    /// Bare numbers are milliseconds; `ms`, `s`, `m` and `h` suffixes are accepted.
    pub fn as_duration_millis(self, default: Duration) -> Arc<Property<Duration>> {
        self.as_type(default)
    }

    /// Delimited list, split on the registry's list delimiter.
    pub fn as_list(self, default: Vec<String>) -> Arc<Property<Vec<String>>> {
        self.as_type(default)
    }

    pub fn as_set(self, default: BTreeSet<String>) -> Arc<Property<BTreeSet<String>>> {
        self.as_type(default)
    }

    /// Any type with a built-in decoder.
    pub fn as_type<T: Decode>(self, default: T) -> Arc<Property<T>> {
        self.registry.builtin(self.key, default)
    }

    /// A type decoded through [`PropertyRegistry::register_decoder`].
    pub fn as_custom<T>(self, default: T) -> Result<Arc<Property<T>>, PropertyError>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let decoder = self
            .registry
            .decoders
            .get::<T>()
            .ok_or(PropertyError::ConverterNotFound {
                type_name: std::any::type_name::<T>(),
            })?;
        Ok(self.registry.handle(self.key, default, move || decoder))
    }
}
