//! Shared utilities for scenario tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use live_config::config::{CompositeConfig, MapConfig, SettableConfig};
use live_config::polling::{Checkpoint, ConfigSource, PollError, PollResponse};

/// The usual production layering, highest priority first:
/// override (settable) > remote (settable, fed by pollers) > application (map).
pub struct Layers {
    pub root: Arc<CompositeConfig>,
    pub overrides: Arc<SettableConfig>,
    pub remote: Arc<SettableConfig>,
}

pub fn layered_tree(application: &[(&str, &str)]) -> Layers {
    let root = Arc::new(CompositeConfig::new("root"));
    let overrides = Arc::new(SettableConfig::new("override"));
    let remote = Arc::new(SettableConfig::new("remote"));
    let application = Arc::new(MapConfig::from_pairs(
        "application",
        application.iter().map(|(k, v)| (k.to_string(), v.to_string())),
    ));

    root.add_last("override", overrides.clone());
    root.add_last("remote", remote.clone());
    root.add_last("application", application);

    Layers {
        root,
        overrides,
        remote,
    }
}

pub fn entries(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A source that replays queued responses, then reports `Unchanged`.
pub struct ScriptedSource {
    name: String,
    script: Mutex<VecDeque<Result<PollResponse, PollError>>>,
    seen: Mutex<Vec<(bool, Option<Checkpoint>)>>,
}

impl ScriptedSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, response: Result<PollResponse, PollError>) {
        self.script.lock().unwrap().push_back(response);
    }

    /// `(initial, checkpoint)` for every poll so far.
    pub fn seen(&self) -> Vec<(bool, Option<Checkpoint>)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfigSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn poll(
        &self,
        initial: bool,
        checkpoint: Option<&Checkpoint>,
    ) -> Result<PollResponse, PollError> {
        self.seen.lock().unwrap().push((initial, checkpoint.cloned()));
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(PollResponse::unchanged()))
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Blocking variant for tests driven from plain threads.
pub fn wait_until_blocking<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
