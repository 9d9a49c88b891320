//! Fixed-budget completion wait.
//!
//! Polls `checkFetchRequestStatus` until the host reports a terminal outcome
//! or the request's budget (not extended by any status) runs out.

use serde_json::Value;
use tokio::time::sleep;

use crate::config::TrackerConfig;
use crate::error::{RequestError, RequestResult};
use crate::host::{FetchStatus, Host};
use crate::notify::check_for_notifications;
use crate::request::RequestState;

pub async fn wait_for_fetch(
    state: &mut RequestState,
    host: &dyn Host,
    config: &TrackerConfig,
) -> RequestResult<Value> {
    loop {
        match FetchStatus::parse(&host.check_fetch_request_status(&state.request_id)) {
            FetchStatus::Succeeded(data) => {
                state.completed = true;
                state.result = Some(data.clone());
                tracing::info!(
                    request_id = %state.request_id,
                    elapsed_ms = state.elapsed().as_millis() as u64,
                    "Fetch completed"
                );
                return Ok(data);
            }
            FetchStatus::Failed(message) => {
                state.error = Some(message.clone());
                tracing::warn!(request_id = %state.request_id, error = %message, "Fetch failed");
                return Err(RequestError::External(message));
            }
            FetchStatus::InFlight => {}
        }

        if state.is_timed_out() {
            tracing::warn!(request_id = %state.request_id, "Fetch timed out");
            return Err(RequestError::Timeout {
                request_id: state.request_id.clone(),
                elapsed: state.elapsed(),
                budget: state.max_wait(),
            });
        }

        let notified = check_for_notifications(state, host, config.polling.notification_wait()).await;
        tracing::trace!(request_id = %state.request_id, notified, "Fetch still in flight");
        sleep(state.poll_interval).await;
    }
}
