//! Polling driven by explicit `fire()` calls, for deterministic tests.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};

use crate::lifecycle::Shutdown;
use crate::polling::scheduler::{PollingHandle, SharedState};
use crate::polling::source::PollError;

type Request = oneshot::Sender<Result<(), PollError>>;

/// Runs the callback once per `fire()`, and never on its own.
pub struct ManualPollingStrategy {
    requests: mpsc::Sender<Request>,
    pending: Mutex<Option<mpsc::Receiver<Request>>>,
    shutdown: Arc<Shutdown>,
}

impl ManualPollingStrategy {
    pub fn new() -> Self {
        let (requests, pending) = mpsc::channel(1);
        Self {
            requests,
            pending: Mutex::new(Some(pending)),
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    /// Start serving `fire()` requests. Must be called within a tokio
    /// runtime. A second call returns a failed handle.
    pub fn execute<F, Fut>(&self, callback: F) -> PollingHandle
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), PollError>> + Send + 'static,
    {
        let state = SharedState::default();
        let taken = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut pending) = taken else {
            return PollingHandle::failed(
                state,
                PollError::Source("manual strategy is already executing".to_string()),
            );
        };

        let task_state = state.clone();
        let mut shutdown_rx = self.shutdown.subscribe();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    request = pending.recv() => {
                        let Some(reply) = request else { break };
                        let result = callback().await;
                        task_state.record(&result);
                        if reply.send(result).is_err() {
                            tracing::debug!("Manual poll caller went away before the result");
                        }
                    }
                }
            }
            tracing::debug!("Manual poller stopped");
        });

        PollingHandle::running(state, task)
    }

    /// Release exactly one poll and return its result.
    pub async fn fire(&self) -> Result<(), PollError> {
        if self.shutdown.is_triggered() {
            return Err(PollError::NotRunning);
        }
        let (reply, result) = oneshot::channel();
        self.requests
            .send(reply)
            .await
            .map_err(|_| PollError::NotRunning)?;
        result.await.map_err(|_| PollError::NotRunning)?
    }

    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }
}

impl Default for ManualPollingStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ManualPollingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualPollingStrategy")
            .field("shutdown", &self.shutdown.is_triggered())
            .finish()
    }
}
