//! External configuration sources and the glue that applies their output
//! to a settable leaf.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{Config, SettableConfig};
use crate::observability::metrics;

/// Opaque token a source hands back to support incremental polls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checkpoint(String);

impl Checkpoint {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Incremental change to a flat key/value map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub upserts: HashMap<String, String>,
    pub removals: Vec<String>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.upserts.insert(key.into(), value.into());
        self
    }

    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.removals.push(key.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }
}

/// What a poll produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollContent {
    /// Full replacement of the leaf's entries.
    Snapshot(HashMap<String, String>),
    Delta(Delta),
    /// Nothing changed since the checkpoint.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResponse {
    pub content: PollContent,
    pub checkpoint: Option<Checkpoint>,
}

impl PollResponse {
    pub fn snapshot(entries: HashMap<String, String>) -> Self {
        Self {
            content: PollContent::Snapshot(entries),
            checkpoint: None,
        }
    }

    pub fn delta(delta: Delta) -> Self {
        Self {
            content: PollContent::Delta(delta),
            checkpoint: None,
        }
    }

    pub fn unchanged() -> Self {
        Self {
            content: PollContent::Unchanged,
            checkpoint: None,
        }
    }

    pub fn with_checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("source error: {0}")]
    Source(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown was signalled before the initial poll succeeded.
    #[error("initial poll interrupted by shutdown")]
    Interrupted,

    #[error("poller is not running")]
    NotRunning,

    #[error("polling period must be non-zero")]
    ZeroPeriod,
}

/// A pull-style source, polled by a scheduler.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch the current content. `initial` is true until the first poll
    /// succeeds; `checkpoint` is whatever the previous response returned.
    async fn poll(
        &self,
        initial: bool,
        checkpoint: Option<&Checkpoint>,
    ) -> Result<PollResponse, PollError>;
}

/// Receiver of pushed updates.
pub trait UpdateSink: Send + Sync {
    fn on_update(&self, content: PollContent);
}

impl UpdateSink for SettableConfig {
    fn on_update(&self, content: PollContent) {
        self.apply(content);
    }
}

/// A push-style source that reports changes as they happen.
pub trait WatchSource: Send + Sync {
    /// Keeps the watch alive; dropping it stops delivery.
    type Guard: Send;

    fn watch(&self, sink: Arc<dyn UpdateSink>) -> Result<Self::Guard, PollError>;
}

/// Boxed poll future, as produced by [`SourcePoller::callback`].
pub type PollFuture = Pin<Box<dyn Future<Output = Result<(), PollError>> + Send>>;

/// Polls one source and applies each response to one settable leaf.
pub struct SourcePoller {
    source: Arc<dyn ConfigSource>,
    target: Arc<SettableConfig>,
    checkpoint: Mutex<Option<Checkpoint>>,
    initialized: AtomicBool,
}

impl SourcePoller {
    pub fn new(source: Arc<dyn ConfigSource>, target: Arc<SettableConfig>) -> Self {
        Self {
            source,
            target,
            checkpoint: Mutex::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn target(&self) -> &Arc<SettableConfig> {
        &self.target
    }

    pub fn checkpoint(&self) -> Option<Checkpoint> {
        self.checkpoint
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run one poll. Returns whether the target changed.
    ///
    /// The source is awaited without any lock held; only the final apply
    /// touches the target's writer lock.
    pub async fn poll_once(&self) -> Result<bool, PollError> {
        let initial = !self.initialized.load(Ordering::Acquire);
        let checkpoint = self.checkpoint();

        let response = match self.source.poll(initial, checkpoint.as_ref()).await {
            Ok(response) => response,
            Err(err) => {
                metrics::record_poll(self.source.name(), "error");
                return Err(err);
            }
        };

        let changed = self.target.apply(response.content);
        if let Some(next) = response.checkpoint {
            *self.checkpoint.lock().unwrap_or_else(PoisonError::into_inner) = Some(next);
        }
        self.initialized.store(true, Ordering::Release);

        metrics::record_poll(self.source.name(), if changed { "changed" } else { "unchanged" });
        tracing::debug!(source = %self.source.name(), initial, changed, "Poll applied");
        Ok(changed)
    }

    /// A scheduler callback bound to this poller.
    pub fn callback(self: &Arc<Self>) -> impl Fn() -> PollFuture + Send + Sync + 'static {
        let poller = Arc::clone(self);
        move || {
            let poller = Arc::clone(&poller);
            Box::pin(async move { poller.poll_once().await.map(|_| ()) })
        }
    }
}

impl std::fmt::Debug for SourcePoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourcePoller")
            .field("source", &self.source.name())
            .field("target", &self.target.name())
            .field("initialized", &self.initialized.load(Ordering::Relaxed))
            .finish()
    }
}
