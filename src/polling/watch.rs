//! File-backed source, usable both polled and watched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::polling::source::{
    Checkpoint, ConfigSource, PollContent, PollError, PollResponse, UpdateSink, WatchSource,
};

/// Turns file contents into a flat key/value map.
pub type Parser = Arc<dyn Fn(&str) -> Result<HashMap<String, String>, String> + Send + Sync>;

/// A file whose parsed contents feed one leaf.
///
/// The file format is up to the caller-supplied parser.
#[derive(Clone)]
pub struct FileWatchSource {
    name: String,
    path: PathBuf,
    parser: Parser,
    poll_interval: Duration,
}

impl FileWatchSource {
    pub fn new<F>(path: impl AsRef<Path>, parser: F) -> Self
    where
        F: Fn(&str) -> Result<HashMap<String, String>, String> + Send + Sync + 'static,
    {
        let path = path.as_ref().to_path_buf();
        Self {
            name: path.display().to_string(),
            path,
            parser: Arc::new(parser),
            poll_interval: Duration::from_secs(2),
        }
    }

    /// Interval for the fallback polling watcher on platforms without
    /// native file events.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, content: &str) -> Result<HashMap<String, String>, PollError> {
        (self.parser)(content)
            .map_err(|e| PollError::Source(format!("{}: {e}", self.path.display())))
    }
}

#[async_trait]
impl ConfigSource for FileWatchSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn poll(
        &self,
        _initial: bool,
        _checkpoint: Option<&Checkpoint>,
    ) -> Result<PollResponse, PollError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(PollResponse::snapshot(self.parse(&content)?))
    }
}

impl WatchSource for FileWatchSource {
    type Guard = RecommendedWatcher;

    /// Push the current contents, then every successfully parsed change.
    fn watch(&self, sink: Arc<dyn UpdateSink>) -> Result<RecommendedWatcher, PollError> {
        let content = std::fs::read_to_string(&self.path)?;
        sink.on_update(PollContent::Snapshot(self.parse(&content)?));

        let source = self.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = %source.path.display(), "Config file change detected, reloading...");
                        let parsed = std::fs::read_to_string(&source.path)
                            .map_err(PollError::from)
                            .and_then(|content| source.parse(&content));
                        match parsed {
                            Ok(entries) => sink.on_update(PollContent::Snapshot(entries)),
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to reload config file. Keeping current values.");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            notify::Config::default().with_poll_interval(self.poll_interval),
        )
        .map_err(|e| PollError::Source(format!("watch {}: {e}", self.path.display())))?;

        watcher
            .watch(&self.path, RecursiveMode::NonRecursive)
            .map_err(|e| PollError::Source(format!("watch {}: {e}", self.path.display())))?;

        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok(watcher)
    }
}

impl std::fmt::Debug for FileWatchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatchSource")
            .field("path", &self.path)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

/// `key=value` lines; blank lines and `#` comments are skipped.
pub fn parse_key_values(content: &str) -> Result<HashMap<String, String>, String> {
    let mut entries = HashMap::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| format!("line {}: expected key=value", number + 1))?;
        entries.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(entries)
}
