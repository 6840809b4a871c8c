//! Loading a cascade of resources into one composite.

use std::sync::Arc;
use thiserror::Error;

use crate::cascade::strategy::{CascadeStrategy, NoCascadeStrategy};
use crate::config::{CompositeConfig, Config};
use crate::interpolation::{InterpolationError, Interpolator, Lookup};

/// Failure reported by a resource loader. Absence is not a failure.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error loading '{resource}': {source}")]
    Io {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{resource}': {message}")]
    Parse { resource: String, message: String },
}

#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("cascade name generation failed: {0}")]
    Interpolation(#[from] InterpolationError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Resolves a resource name to a config node.
pub trait ConfigLoader: Send + Sync {
    /// `Ok(None)` when no resource of that name exists.
    fn load(&self, resource: &str) -> Result<Option<Arc<dyn Config>>, LoadError>;
}

/// Runs a cascade strategy and merges every candidate that loads.
pub struct CascadingLoader {
    loader: Arc<dyn ConfigLoader>,
    strategy: Arc<dyn CascadeStrategy>,
    interpolator: Interpolator,
}

impl CascadingLoader {
    pub fn new(loader: Arc<dyn ConfigLoader>) -> Self {
        Self {
            loader,
            strategy: Arc::new(NoCascadeStrategy),
            interpolator: Interpolator::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn CascadeStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_interpolator(mut self, interpolator: Interpolator) -> Self {
        self.interpolator = interpolator;
        self
    }

    /// Load `name` and its cascade variants.
    ///
    /// The result holds one child per found candidate, most specific first.
    /// Missing candidates are skipped; loader errors abort the load.
    pub fn load(&self, name: &str, lookup: &dyn Lookup) -> Result<CompositeConfig, CascadeError> {
        let candidates = self.strategy.generate(name, &self.interpolator, lookup)?;
        let composite = CompositeConfig::new(name);

        for candidate in &candidates {
            match self.loader.load(candidate)? {
                Some(config) => {
                    tracing::debug!(resource = %candidate, "Loaded cascade candidate");
                    composite.add_first(candidate.clone(), config);
                }
                None => {
                    tracing::debug!(resource = %candidate, "Cascade candidate not found, skipping");
                }
            }
        }

        if composite.len() == 0 {
            tracing::warn!(resource = %name, candidates = ?candidates, "No cascade candidate found");
        }
        Ok(composite)
    }
}
