//! Metrics collection.
//!
//! # Metrics
//! - `live_config_polls_total` (counter): poll attempts by source, outcome
//! - `live_config_property_refresh_total` (counter): property re-resolutions
//! - `live_config_decode_errors_total` (counter): failed resolutions by stage
//! - `live_config_notifications_total` (counter): listener invocations
//! - `live_config_tree_version` (gauge): latest version per config node
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; the application installs the
//!   recorder (none installed means these are no-ops)
//! - Low-overhead metric updates on every hot path

use metrics::{counter, gauge};

pub fn record_poll(source: &str, outcome: &'static str) {
    counter!(
        "live_config_polls_total",
        "source" => source.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_property_refresh() {
    counter!("live_config_property_refresh_total").increment(1);
}

pub fn record_decode_error(stage: &'static str) {
    counter!("live_config_decode_errors_total", "stage" => stage).increment(1);
}

pub fn record_notification() {
    counter!("live_config_notifications_total").increment(1);
}

pub fn record_tree_version(name: &str, version: u64) {
    gauge!("live_config_tree_version", "name" => name.to_string()).set(version as f64);
}
