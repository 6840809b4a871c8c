//! The config node abstraction shared by leaves and composites.

use std::sync::Arc;

use crate::config::error::ConfigError;
use crate::config::visitor::Visitor;

/// Callback fired after a node (or anything beneath it) changed.
///
/// Runs inline on the mutating thread, after the mutation is visible, so
/// implementations must be cheap and must not block.
pub trait ConfigListener: Send + Sync {
    fn on_config_updated(&self, config: &dyn Config);
}

/// Where a lookup was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The raw, uninterpolated value.
    pub value: String,
    /// Name of the leaf that owns the value.
    pub source: String,
    /// Number of composite levels between the queried node and the owner.
    pub depth: usize,
}

/// A node in the configuration tree.
pub trait Config: Send + Sync {
    /// Identifier used in diagnostics and override reporting.
    fn name(&self) -> &str;

    /// Monotonic counter bumped on every mutation of this node or its children.
    fn version(&self) -> u64;

    /// Raw value for `key`, without interpolation.
    fn get_raw(&self, key: &str) -> Option<String>;

    /// Every key visible through this node.
    fn keys(&self) -> Vec<String>;

    /// Depth-first traversal for diagnostics.
    fn accept(&self, visitor: &mut dyn Visitor);

    fn add_listener(&self, listener: Arc<dyn ConfigListener>);

    fn remove_listener(&self, listener: &Arc<dyn ConfigListener>);

    fn contains_key(&self, key: &str) -> bool {
        self.get_raw(key).is_some()
    }

    fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Like `get_raw` but reports which node answered.
    fn resolve(&self, key: &str) -> Option<Resolution> {
        self.get_raw(key).map(|value| Resolution {
            value,
            source: self.name().to_string(),
            depth: 0,
        })
    }

    /// Raw value for a key the caller cannot do without.
    fn require(&self, key: &str) -> Result<String, ConfigError> {
        self.get_raw(key).ok_or_else(|| ConfigError::NotFound {
            key: key.to_string(),
            config: self.name().to_string(),
        })
    }
}
