//! Metrics collection.
//!
//! # Metrics
//! - `tracker_requests_started_total` (counter)
//! - `tracker_requests_finished_total` (counter): by outcome
//! - `tracker_notifications_total` (counter): by fan-in source
//! - `tracker_request_duration_seconds` (histogram): by outcome
//! - `tracker_registry_size` (gauge): registered requests
//!
//! # Design Decisions
//! - Uses the `metrics` facade only; installing a recorder is up to the embedder
//! - Without a recorder every call is a no-op

use std::time::Duration;

/// Record a request handed to the host.
pub fn record_request_started() {
    ::metrics::counter!("tracker_requests_started_total").increment(1);
}

/// Record a finished request with its outcome label.
pub fn record_request_finished(outcome: &'static str, elapsed: Duration) {
    ::metrics::counter!("tracker_requests_finished_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("tracker_request_duration_seconds", "outcome" => outcome)
        .record(elapsed.as_secs_f64());
}

/// Record which fan-in source fired.
pub fn record_notification(source: &'static str) {
    ::metrics::counter!("tracker_notifications_total", "source" => source).increment(1);
}

/// Record the number of registered requests.
pub fn record_registry_size(size: usize) {
    ::metrics::gauge!("tracker_registry_size").set(size as f64);
}
