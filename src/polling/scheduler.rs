//! Fixed-rate polling with a blocking first attempt.
//!
//! # State Transitions
//! ```text
//! execute()
//!     initial = sync:  attempt → fail → wait retry delay → attempt ... → success
//!                      shutdown while retrying → handle already failed
//!     initial = async: skip straight to the schedule
//! schedule: tick every period → poll → log and swallow failures
//! shutdown: loop exits after the poll in flight (if any) completes
//! ```

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::lifecycle::Shutdown;
use crate::polling::backoff::retry_delay;
use crate::polling::source::PollError;
use crate::settings::{InitialMode, PollingSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Success,
    Failure,
}

/// Bookkeeping for one scheduled callback.
#[derive(Debug, Clone, Default)]
pub struct PollState {
    pub attempts: u64,
    pub consecutive_failures: u32,
    pub last_outcome: Option<PollOutcome>,
    pub last_success: Option<SystemTime>,
    pub last_error: Option<String>,
    pub next_due: Option<Instant>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SharedState(Arc<Mutex<PollState>>);

impl SharedState {
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut PollState) -> R) -> R {
        f(&mut self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn snapshot(&self) -> PollState {
        self.update(|state| state.clone())
    }

    pub(crate) fn record(&self, result: &Result<(), PollError>) {
        self.update(|state| {
            state.attempts += 1;
            match result {
                Ok(()) => {
                    state.consecutive_failures = 0;
                    state.last_outcome = Some(PollOutcome::Success);
                    state.last_success = Some(SystemTime::now());
                }
                Err(err) => {
                    state.consecutive_failures += 1;
                    state.last_outcome = Some(PollOutcome::Failure);
                    state.last_error = Some(err.to_string());
                }
            }
        });
    }
}

/// Returned by `execute`. Dropping it does not stop the schedule; use the
/// strategy's `shutdown`.
#[derive(Debug)]
pub struct PollingHandle {
    state: SharedState,
    failure: Option<PollError>,
    task: Option<JoinHandle<()>>,
}

impl PollingHandle {
    pub(crate) fn running(state: SharedState, task: JoinHandle<()>) -> Self {
        Self {
            state,
            failure: None,
            task: Some(task),
        }
    }

    pub(crate) fn failed(state: SharedState, failure: PollError) -> Self {
        Self {
            state,
            failure: Some(failure),
            task: None,
        }
    }

    pub fn state(&self) -> PollState {
        self.state.snapshot()
    }

    /// True when `execute` gave up before scheduling anything.
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn failure(&self) -> Option<&PollError> {
        self.failure.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Wait for the schedule to stop.
    pub async fn wait(self) -> Result<(), PollError> {
        if let Some(failure) = self.failure {
            return Err(failure);
        }
        match self.task {
            Some(task) => task
                .await
                .map_err(|e| PollError::Source(format!("polling task failed: {e}"))),
            None => Err(PollError::NotRunning),
        }
    }
}

/// Polls at a fixed period after a successful first attempt.
pub struct FixedRatePollingStrategy {
    settings: PollingSettings,
    shutdown: Arc<Shutdown>,
}

impl FixedRatePollingStrategy {
    pub fn new(settings: PollingSettings, shutdown: Arc<Shutdown>) -> Self {
        Self { settings, shutdown }
    }

    /// Fixed period and fixed retry delay.
    pub fn with_period(period: Duration, retry: Duration, shutdown: Arc<Shutdown>) -> Self {
        let retry_ms = u64::try_from(retry.as_millis()).unwrap_or(u64::MAX);
        Self::new(
            PollingSettings {
                period_ms: u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
                retry_delay_ms: retry_ms,
                max_retry_delay_ms: None,
                initial: InitialMode::Sync,
            },
            shutdown,
        )
    }

    pub fn settings(&self) -> &PollingSettings {
        &self.settings
    }

    /// Run `callback` now (retrying until it succeeds, unless initialization
    /// is async), then every period until shutdown.
    pub async fn execute<F, Fut>(&self, callback: F) -> PollingHandle
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), PollError>> + Send + 'static,
    {
        let state = SharedState::default();
        let mut shutdown_rx = self.shutdown.subscribe();
        let period = self.settings.period();
        if period.is_zero() {
            tracing::error!("Refusing to schedule with a zero polling period");
            return PollingHandle::failed(state, PollError::ZeroPeriod);
        }

        let first_tick = match self.settings.initial {
            InitialMode::Sync => {
                if let Err(err) = self.initial_poll(&callback, &state, &mut shutdown_rx).await {
                    return PollingHandle::failed(state, err);
                }
                time::Instant::now() + period
            }
            InitialMode::Async => time::Instant::now(),
        };

        state.update(|s| s.next_due = Some(first_tick.into_std()));
        tracing::info!(period_ms = self.settings.period_ms, "Polling scheduled");

        let shutdown = self.shutdown.clone();
        let task = tokio::spawn(run_schedule(
            callback,
            state.clone(),
            first_tick,
            period,
            shutdown,
            shutdown_rx,
        ));
        PollingHandle::running(state, task)
    }

    /// Stop future polls on every schedule sharing this strategy's signal.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    async fn initial_poll<F, Fut>(
        &self,
        callback: &F,
        state: &SharedState,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<(), PollError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<(), PollError>>,
    {
        let max_ms = self.settings.max_retry_delay_ms.unwrap_or(self.settings.retry_delay_ms);
        let mut attempt = 0u32;

        loop {
            if self.shutdown.is_triggered() {
                tracing::warn!(attempts = attempt, "Initial poll interrupted by shutdown");
                return Err(PollError::Interrupted);
            }

            attempt = attempt.saturating_add(1);
            let result = callback().await;
            state.record(&result);
            let Err(err) = result else {
                tracing::info!(attempts = attempt, "Initial poll succeeded");
                return Ok(());
            };

            let delay = retry_delay(attempt, self.settings.retry_delay_ms, max_ms);
            tracing::warn!(
                attempt,
                error = %err,
                retry_in_ms = delay.as_millis() as u64,
                "Initial poll failed, retrying"
            );

            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = shutdown_rx.recv() => {
                    tracing::warn!(attempts = attempt, "Initial poll interrupted by shutdown");
                    return Err(PollError::Interrupted);
                }
            }
        }
    }
}

impl std::fmt::Debug for FixedRatePollingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedRatePollingStrategy")
            .field("settings", &self.settings)
            .field("shutdown", &self.shutdown.is_triggered())
            .finish()
    }
}

async fn run_schedule<F, Fut>(
    callback: F,
    state: SharedState,
    start: time::Instant,
    period: Duration,
    shutdown: Arc<Shutdown>,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), PollError>> + Send + 'static,
{
    let mut ticker = time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if shutdown.is_triggered() {
            break;
        }
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                break;
            }
            _ = ticker.tick() => {
                // Runs to completion even if shutdown fires meanwhile
                let result = callback().await;
                if let Err(err) = &result {
                    tracing::error!(error = %err, "Scheduled poll failed");
                }
                state.record(&result);
                state.update(|s| s.next_due = Some(Instant::now() + period));
            }
        }
    }

    state.update(|s| s.next_due = None);
    tracing::info!("Poller received shutdown signal, exiting loop");
}
