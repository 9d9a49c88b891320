//! Notification fan-in.
//!
//! Merges the four ways a completion can reach the poll loop into a single
//! bounded check:
//!
//! ```text
//! 1. checkResponseLookup(url)      (host cache, no side effects)
//! 2. promise channel try_recv      (completion promise settled)
//! 3. notify channel try_recv       (inbound callback fired)
//! 4. select over both, ≤ wait      (last resort against busy-spin)
//! ```
//!
//! A hit triggers `forceRequestStatusCheck` so the next status query is
//! fresh.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::host::{Host, LookupResult};
use crate::observability::metrics;
use crate::request::RequestState;

/// Which tier of the fan-in fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationSource {
    ResponseLookup,
    Promise,
    Notify,
    BoundedWait,
}

impl NotificationSource {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationSource::ResponseLookup => "response_lookup",
            NotificationSource::Promise => "promise",
            NotificationSource::Notify => "notify",
            NotificationSource::BoundedWait => "bounded_wait",
        }
    }
}

async fn recv_promise(rx: &mut Option<mpsc::Receiver<()>>) -> Option<()> {
    match rx {
        Some(rx) => rx.recv().await,
        None => None,
    }
}

/// Find the first tier with a pending signal, consuming it.
pub async fn poll_sources(
    state: &mut RequestState,
    host: &dyn Host,
    wait: Duration,
) -> Option<NotificationSource> {
    if LookupResult::parse(&host.check_response_lookup(&state.proxied_url)).complete {
        return Some(NotificationSource::ResponseLookup);
    }

    if let Some(rx) = state.promise_rx.as_mut() {
        if rx.try_recv().is_ok() {
            return Some(NotificationSource::Promise);
        }
    }

    if state.notify_rx.try_recv().is_ok() {
        return Some(NotificationSource::Notify);
    }

    let promise_rx = &mut state.promise_rx;
    let notify_rx = &mut state.notify_rx;
    let fired = timeout(wait, async {
        tokio::select! {
            Some(()) = recv_promise(promise_rx) => true,
            Some(()) = notify_rx.recv() => true,
            else => false,
        }
    })
    .await;

    matches!(fired, Ok(true)).then_some(NotificationSource::BoundedWait)
}

/// Returns true if anything happened for this request since the last check.
pub async fn check_for_notifications(state: &mut RequestState, host: &dyn Host, wait: Duration) -> bool {
    if state.is_closed() {
        return false;
    }

    match poll_sources(state, host, wait).await {
        Some(source) => {
            metrics::record_notification(source.as_str());
            tracing::debug!(request_id = %state.request_id, source = source.as_str(), "Notification received");
            host.force_request_status_check(&state.request_id);
            true
        }
        None => false,
    }
}
