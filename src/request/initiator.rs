//! Request initiation.
//!
//! # Responsibilities
//! - Rewrite the URL to the same-origin proxy path
//! - Start the call on the host and obtain its request ID
//! - Register the notify channel and wire the optional completion promise

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;

use crate::config::TrackerConfig;
use crate::error::{RequestError, RequestResult};
use crate::host::{Host, HostError};
use crate::notify::{signal_channel, NotificationRegistry};
use crate::observability::metrics;
use crate::request::proxy_url::proxy_url;
use crate::request::state::RequestState;

/// Start a request on the host and return its registered state.
///
/// Must run inside a Tokio runtime, which the promise waiter and the host's
/// listener are spawned onto. Fails with `RequestError::Initialization` when
/// no runtime is current or the host lacks `startApiRequest`; nothing is
/// started or registered in either case.
pub fn initiate(
    host: &Arc<dyn Host>,
    registry: &NotificationRegistry,
    config: &TrackerConfig,
    url: &str,
    token: &str,
    options: &Value,
    max_wait: Duration,
) -> RequestResult<RequestState> {
    let runtime = Handle::try_current()
        .map_err(|e| RequestError::Initialization(format!("no Tokio runtime: {e}")))?;

    let proxied_url = if config.proxy.enabled {
        proxy_url(url, &config.proxy.path_prefix)
    } else {
        url.to_string()
    };

    let request_id = host.start_api_request(&proxied_url, token, options)?;

    let (notify_tx, notify_rx) = signal_channel();
    registry.register(&request_id, notify_tx)?;

    let mut state = RequestState::new(
        request_id,
        url.to_string(),
        proxied_url,
        max_wait,
        config.polling.initial_interval(),
        notify_rx,
    );

    match host.register_status_listener(&state.request_id) {
        Ok(registered) => {
            tracing::debug!(request_id = %state.request_id, registered, "Status listener requested");
        }
        Err(HostError::Missing(name)) => {
            tracing::trace!(request_id = %state.request_id, function = name, "No status listener on host");
        }
        Err(e) => {
            tracing::warn!(request_id = %state.request_id, error = %e, "Status listener registration failed");
        }
    }

    if let Some(promise) =
        host.wait_until_request_complete(&state.request_id, config.budget.promise_timeout())
    {
        let (promise_tx, promise_rx) = signal_channel();
        let request_id = state.request_id.clone();
        let task = runtime.spawn(async move {
            // Resolve and reject both only mean "look again".
            match promise.await {
                Ok(()) => tracing::debug!(request_id = %request_id, "Completion promise resolved"),
                Err(e) => tracing::debug!(request_id = %request_id, error = %e, "Completion promise rejected"),
            }
            let _ = promise_tx.try_send(());
        });
        state.promise_rx = Some(promise_rx);
        state.promise_task = Some(task);
    }

    metrics::record_request_started();
    tracing::info!(
        request_id = %state.request_id,
        url = %state.url,
        proxied_url = %state.proxied_url,
        max_wait_ms = max_wait.as_millis() as u64,
        promise = state.has_promise(),
        "Request initiated"
    );

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SimulatedHost;

    fn host(sim: SimulatedHost) -> Arc<dyn Host> {
        Arc::new(sim)
    }

    #[tokio::test]
    async fn test_missing_start_leaves_nothing_registered() {
        let registry = NotificationRegistry::new();
        let err = initiate(
            &host(SimulatedHost::new().without_start_request()),
            &registry,
            &TrackerConfig::default(),
            "https://example.com/x",
            "token",
            &Value::Null,
            Duration::from_secs(30),
        )
        .unwrap_err();

        assert!(matches!(err, RequestError::Initialization(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_outside_runtime_is_an_initialization_error() {
        let sim = SimulatedHost::new();
        let registry = NotificationRegistry::new();
        let err = initiate(
            &host(sim.clone()),
            &registry,
            &TrackerConfig::default(),
            "https://example.com/x",
            "token",
            &Value::Null,
            Duration::from_secs(30),
        )
        .unwrap_err();

        assert!(matches!(err, RequestError::Initialization(_)));
        assert!(registry.is_empty());
        assert_eq!(sim.request_count(), 0);
    }

    #[tokio::test]
    async fn test_registers_and_rewrites() {
        let registry = NotificationRegistry::new();
        let state = initiate(
            &host(SimulatedHost::new()),
            &registry,
            &TrackerConfig::default(),
            "https://example.com/v2/ports",
            "token",
            &Value::Null,
            Duration::from_secs(30),
        )
        .unwrap();

        assert!(registry.contains(&state.request_id));
        assert_eq!(state.url, "https://example.com/v2/ports");
        assert_eq!(state.proxied_url, "/v2/ports?base=example.com");
        assert_eq!(state.poll_interval, Duration::from_millis(100));
        assert!(state.has_promise());
    }

    #[tokio::test]
    async fn test_without_promise() {
        let registry = NotificationRegistry::new();
        let mut config = TrackerConfig::default();
        config.proxy.enabled = false;
        let state = initiate(
            &host(SimulatedHost::new().without_promise().without_listener()),
            &registry,
            &config,
            "https://example.com/v2/ports",
            "token",
            &Value::Null,
            Duration::from_secs(30),
        )
        .unwrap();

        assert!(!state.has_promise());
        assert_eq!(state.proxied_url, state.url);
    }
}
