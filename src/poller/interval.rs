//! Time-based cadence policies.
//!
//! # Precedence
//! The status handlers tighten `poll_interval` to the active interval while
//! the time-based backoff here widens it. A status-driven reset wins for
//! `reset_hold` after it fired; after that the backoff applies again.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::PollingConfig;
use crate::host::Host;
use crate::request::RequestState;

/// Widen the poll interval according to the elapsed time.
///
/// Steps are applied in order and the last matching one wins, so the
/// duplicated 10s threshold resolves to the later step. Returns true if the
/// interval changed.
pub fn adjust_polling_interval(state: &mut RequestState, polling: &PollingConfig) -> bool {
    if let Some(reset) = state.last_status_reset {
        if reset.elapsed() < polling.reset_hold() {
            return false;
        }
    }

    let elapsed = state.elapsed();
    let mut target = None;
    for step in &polling.backoff_steps {
        if elapsed > Duration::from_secs(step.after_secs) {
            target = Some(Duration::from_millis(step.interval_ms));
        }
    }

    match target {
        Some(interval) if interval != state.poll_interval => {
            tracing::trace!(
                request_id = %state.request_id,
                from_ms = state.poll_interval.as_millis() as u64,
                to_ms = interval.as_millis() as u64,
                "Poll interval adjusted"
            );
            state.poll_interval = interval;
            true
        }
        _ => false,
    }
}

/// Ask the host to recheck the request at every `force_check_every_secs`
/// boundary, whether or not a notification arrived. Returns true if a
/// recheck was triggered.
pub fn force_status_check_if_due(state: &mut RequestState, host: &dyn Host, polling: &PollingConfig) -> bool {
    let period = polling.force_check_every_secs.max(1);
    let boundary = state.elapsed().as_secs() / period;
    if boundary <= state.forced_checks {
        return false;
    }
    state.forced_checks = boundary;
    let promoted = host.force_request_status_check(&state.request_id);
    tracing::debug!(
        request_id = %state.request_id,
        elapsed_secs = state.elapsed().as_secs(),
        promoted,
        "Forced status check"
    );
    true
}

/// Throttled status logging. Reads request state, never writes it.
#[derive(Debug)]
pub struct StatusLogger {
    every: Duration,
    last: Option<Instant>,
}

impl StatusLogger {
    pub fn new(polling: &PollingConfig) -> Self {
        Self {
            every: Duration::from_secs(polling.log_every_secs),
            last: None,
        }
    }

    /// Log the request's status unless a line was written recently.
    /// Returns true if a line was written.
    pub fn log_request_status(&mut self, state: &RequestState, notified: bool) -> bool {
        let now = Instant::now();
        if let Some(last) = self.last {
            if now.duration_since(last) < self.every {
                return false;
            }
        }
        self.last = Some(now);

        let status = state
            .last_status
            .as_ref()
            .map(|s| s.kind.as_str())
            .unwrap_or("initiated");
        tracing::info!(
            request_id = %state.request_id,
            status,
            elapsed_ms = state.elapsed().as_millis() as u64,
            remaining_ms = state.remaining().as_millis() as u64,
            poll_interval_ms = state.poll_interval.as_millis() as u64,
            header_received = state.header_received(),
            notified,
            "Request status"
        );
        true
    }
}
