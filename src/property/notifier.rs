//! Background delivery of property change notifications.
//!
//! Mutation threads only enqueue work here. A dedicated thread re-resolves
//! handles that have listeners and runs listener callbacks, so no tree lock
//! or registry lock is held while user code runs. Deliveries are queued
//! under the property's key lock, so one key's listeners see its values in
//! the order they were resolved.

use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::thread;

use tokio::sync::mpsc;

use crate::observability::metrics;

/// A batch of listener invocations for one transition.
pub(crate) type Job = Box<dyn FnOnce() + Send>;

pub(crate) enum Task {
    /// The tree changed; re-resolve every observed handle.
    RefreshAll,
    Deliver(Job),
}

/// A handle the notifier can re-resolve without knowing its value type.
pub(crate) trait Refresh: Send + Sync {
    /// Re-resolve if anyone is listening. A transition is queued behind any
    /// earlier delivery for the same key.
    fn refresh_observed(&self);
}

/// Source of the handles to refresh. Held weakly by the notifier thread.
pub(crate) trait RefreshSource: Send + Sync {
    fn refreshers(&self) -> Vec<Arc<dyn Refresh>>;
}

/// Start the notifier thread. It exits once every sender is dropped.
pub(crate) fn spawn(source: Weak<dyn RefreshSource>) -> io::Result<mpsc::UnboundedSender<Task>> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::Builder::new()
        .name("property-notifier".to_string())
        .spawn(move || run(rx, source))?;
    Ok(tx)
}

fn run(mut rx: mpsc::UnboundedReceiver<Task>, source: Weak<dyn RefreshSource>) {
    tracing::debug!("Property notifier started");

    while let Some(task) = rx.blocking_recv() {
        match task {
            Task::Deliver(job) => job(),
            Task::RefreshAll => {
                // Fold queued refresh requests into this pass
                let mut pending = Vec::new();
                while let Ok(next) = rx.try_recv() {
                    if let Task::Deliver(job) = next {
                        pending.push(job);
                    }
                }
                for job in pending {
                    job();
                }

                let Some(source) = source.upgrade() else {
                    continue;
                };
                for handle in source.refreshers() {
                    handle.refresh_observed();
                }
            }
        }
    }

    tracing::debug!("Property notifier stopped");
}

/// Run one listener callback, containing panics so later listeners and later
/// notifications still run.
pub(crate) fn invoke<F: FnOnce()>(key: &str, callback: F) {
    metrics::record_notification();
    if catch_unwind(AssertUnwindSafe(callback)).is_err() {
        tracing::error!(key = %key, "Property listener panicked");
    }
}
