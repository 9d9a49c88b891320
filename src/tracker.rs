//! Request tracker.
//!
//! Owns one notification registry, one host handle and one configuration.
//! Independent trackers share nothing, so tests and embedders can run as
//! many as they like.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::Instrument;

use crate::config::TrackerConfig;
use crate::error::RequestResult;
use crate::host::Host;
use crate::notify::{check_for_notifications, NotificationRegistry, Notifier};
use crate::observability::metrics;
use crate::poller::{poll_until_complete, wait_for_fetch};
use crate::request::{initiate, TrackedRequest};

/// Tracks outbound calls made through a [`Host`].
#[derive(Clone)]
pub struct RequestTracker {
    host: Arc<dyn Host>,
    registry: Arc<NotificationRegistry>,
    config: Arc<TrackerConfig>,
}

impl RequestTracker {
    pub fn new(host: Arc<dyn Host>, config: TrackerConfig) -> Self {
        Self {
            host,
            registry: Arc::new(NotificationRegistry::new()),
            config: Arc::new(config),
        }
    }

    /// Callback handle to give to the host at startup.
    pub fn notifier(&self) -> Notifier {
        Notifier::new(self.registry.clone())
    }

    pub fn registry(&self) -> &Arc<NotificationRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Start a request with the configured initial budget. Must be called
    /// from within a Tokio runtime.
    pub fn start(&self, url: &str, token: &str, options: &Value) -> RequestResult<TrackedRequest> {
        self.start_with_budget(url, token, options, self.config.budget.initial_wait())
    }

    /// Start a request with an explicit initial budget.
    pub fn start_with_budget(
        &self,
        url: &str,
        token: &str,
        options: &Value,
        max_wait: Duration,
    ) -> RequestResult<TrackedRequest> {
        let state = initiate(
            &self.host,
            &self.registry,
            &self.config,
            url,
            token,
            options,
            max_wait,
        )?;
        Ok(TrackedRequest::new(state, self.registry.clone()))
    }

    /// One fan-in check for a started request.
    pub async fn check_for_notifications(&self, request: &mut TrackedRequest) -> bool {
        check_for_notifications(request, self.host.as_ref(), self.config.polling.notification_wait()).await
    }

    /// Run the status poll loop for a started request.
    ///
    /// The request is cleaned up as soon as the loop returns, whatever the
    /// outcome. If this future is dropped mid-flight, the guard's `Drop`
    /// cleans up instead.
    pub async fn poll(&self, request: &mut TrackedRequest) -> RequestResult<Value> {
        let span = tracing::info_span!("request", request_id = %request.request_id);
        let outcome = poll_until_complete(request, self.host.as_ref(), &self.config)
            .instrument(span)
            .await;
        record_outcome(request, &outcome);
        request.cleanup();
        outcome
    }

    /// Start a request and poll it to completion.
    pub async fn execute(&self, url: &str, token: &str, options: &Value) -> RequestResult<Value> {
        let mut request = self.start(url, token, options)?;
        self.poll(&mut request).await
    }

    /// Start a request and wait for `checkFetchRequestStatus` to settle,
    /// with the fixed fetch budget and no extensions.
    pub async fn fetch(&self, url: &str, token: &str, options: &Value) -> RequestResult<Value> {
        let mut request =
            self.start_with_budget(url, token, options, self.config.budget.fetch_timeout())?;
        let span = tracing::info_span!("fetch", request_id = %request.request_id);
        let outcome = wait_for_fetch(&mut request, self.host.as_ref(), &self.config)
            .instrument(span)
            .await;
        record_outcome(&request, &outcome);
        request.cleanup();
        outcome
    }
}

fn record_outcome(request: &TrackedRequest, outcome: &RequestResult<Value>) {
    let label = match outcome {
        Ok(_) => "completed",
        Err(e) => e.outcome(),
    };
    metrics::record_request_finished(label, request.elapsed());
}

impl std::fmt::Debug for RequestTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestTracker")
            .field("registered", &self.registry.len())
            .field("config", &self.config)
            .finish()
    }
}
