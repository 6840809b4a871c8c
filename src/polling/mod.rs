//! Polling subsystem.
//!
//! # Data Flow
//! ```text
//! FixedRatePollingStrategy::execute(callback)
//!     → first attempt (retry with backoff.rs delay until success or shutdown)
//!     → spawned schedule: tick → callback
//!
//! callback = SourcePoller::callback()
//!     → ConfigSource::poll(initial, checkpoint)   (no lock held)
//!     → SettableConfig::apply(snapshot | delta)   (writer lock for the swap)
//!     → leaf version bump → parents re-publish → properties invalidated
//!
//! FileWatchSource::watch(sink)
//!     → notify event → re-read & parse → UpdateSink::on_update
//! ```
//!
//! # Design Decisions
//! - Shutdown stops future polls but never cancels one in flight
//! - Failures after the first success are logged and swallowed
//! - The manual strategy runs exactly one poll per `fire()`

pub mod backoff;
pub mod manual;
pub mod scheduler;
pub mod source;
pub mod watch;

pub use manual::ManualPollingStrategy;
pub use scheduler::{FixedRatePollingStrategy, PollOutcome, PollState, PollingHandle};
pub use source::{
    Checkpoint, ConfigSource, Delta, PollContent, PollError, PollFuture, PollResponse,
    SourcePoller, UpdateSink, WatchSource,
};
pub use watch::{parse_key_values, FileWatchSource};
