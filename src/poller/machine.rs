//! Status poll loop.
//!
//! # States
//! ```text
//! Initiated → [HeadersReceived] → [Processing]* → [PartialResult]* → Completed
//!                                                                   | Error
//!                                                                   | TimedOut
//! ```
//!
//! # Iteration
//! ```text
//! timeout check → forced recheck (10s boundaries) → notification fan-in
//!     → checkRequestStatus → handler dispatch → backoff → status log
//!     → sleep(poll_interval)
//! ```
//!
//! The timeout is checked by the loop itself at the top of every iteration;
//! no timer races the loop.

use serde_json::Value;
use tokio::time::sleep;

use crate::config::TrackerConfig;
use crate::error::{RequestError, RequestResult};
use crate::host::{FetchStatus, Host, StatusKind, StatusSnapshot};
use crate::notify::check_for_notifications;
use crate::poller::handlers::{handle_headers_received, handle_partial_result, handle_processing};
use crate::poller::interval::{adjust_polling_interval, force_status_check_if_due, StatusLogger};
use crate::request::RequestState;

/// Outcome of applying one status snapshot.
#[derive(Debug)]
enum Step {
    Continue,
    Done(Value),
    Failed(String),
}

/// Apply one status snapshot to the request.
fn apply_status(
    state: &mut RequestState,
    snapshot: &StatusSnapshot,
    host: &dyn Host,
    config: &TrackerConfig,
) -> Step {
    match snapshot.kind {
        StatusKind::Completed => {
            let result = snapshot.result.clone().or_else(|| {
                match FetchStatus::parse(&host.check_fetch_request_status(&state.request_id)) {
                    FetchStatus::Succeeded(data) => Some(data),
                    _ => None,
                }
            });
            match result {
                Some(result) => Step::Done(result),
                None => {
                    tracing::debug!(
                        request_id = %state.request_id,
                        "Completed status without a result, still waiting"
                    );
                    Step::Continue
                }
            }
        }
        StatusKind::Error => {
            let message = snapshot.error.clone().unwrap_or_else(|| {
                match FetchStatus::parse(&host.check_fetch_request_status(&state.request_id)) {
                    FetchStatus::Failed(message) => message,
                    _ => "unknown error".to_string(),
                }
            });
            Step::Failed(message)
        }
        StatusKind::HeadersReceived => {
            handle_headers_received(state, snapshot.headers, config);
            Step::Continue
        }
        StatusKind::Processing => {
            handle_processing(state, config);
            Step::Continue
        }
        StatusKind::PartialResult => {
            handle_partial_result(state, config);
            Step::Continue
        }
        StatusKind::Pending | StatusKind::NotFound | StatusKind::Unknown => Step::Continue,
    }
}

/// Drive a request until it completes, fails or runs out of budget.
pub async fn poll_until_complete(
    state: &mut RequestState,
    host: &dyn Host,
    config: &TrackerConfig,
) -> RequestResult<Value> {
    let mut logger = StatusLogger::new(&config.polling);

    loop {
        if state.is_timed_out() {
            tracing::warn!(
                request_id = %state.request_id,
                elapsed_ms = state.elapsed().as_millis() as u64,
                max_wait_ms = state.max_wait().as_millis() as u64,
                "Request timed out"
            );
            return Err(RequestError::Timeout {
                request_id: state.request_id.clone(),
                elapsed: state.elapsed(),
                budget: state.max_wait(),
            });
        }

        force_status_check_if_due(state, host, &config.polling);
        let notified = check_for_notifications(state, host, config.polling.notification_wait()).await;

        let snapshot = StatusSnapshot::parse(&host.check_request_status(&state.request_id));
        let step = apply_status(state, &snapshot, host, config);
        state.last_status = Some(snapshot);

        match step {
            Step::Done(result) => {
                state.completed = true;
                state.result = Some(result.clone());
                tracing::info!(
                    request_id = %state.request_id,
                    elapsed_ms = state.elapsed().as_millis() as u64,
                    "Request completed"
                );
                return Ok(result);
            }
            Step::Failed(message) => {
                state.error = Some(message.clone());
                tracing::warn!(request_id = %state.request_id, error = %message, "Request failed");
                return Err(RequestError::External(message));
            }
            Step::Continue => {}
        }

        adjust_polling_interval(state, &config.polling);
        logger.log_request_status(state, notified);

        sleep(state.poll_interval).await;
    }
}
