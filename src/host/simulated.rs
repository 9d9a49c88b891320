//! In-process host used by the demo binary and the test suite.
//!
//! Mirrors a browser-side request table: each started request follows a
//! scripted list of [`Step`]s on a background task, keeps a per-URL response
//! cache, and calls back into the tracker through a [`Notifier`].
//!
//! A cached response belongs to the request that produced it. Starting a new
//! request for the URL discards it, promoting a pending request consumes it,
//! and a forced check acts on it at most once.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use dashmap::DashMap;
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};

use crate::host::{CompletionPromise, Host, HostError};
use crate::notify::Notifier;

/// Interval of the host-side completion promise check.
const PROMISE_CHECK_INTERVAL: Duration = Duration::from_millis(100);
/// Interval of the host-side status listener.
const LISTENER_INTERVAL: Duration = Duration::from_millis(200);
/// A status listener gives up after this long.
const LISTENER_LIFETIME: Duration = Duration::from_secs(60);
/// Finished requests are forgotten after this long.
const FINISHED_RETENTION: Duration = Duration::from_secs(300);

/// One scripted event in a simulated request's life.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Wait(Duration),
    Headers { status: u16, content_length: Option<u64> },
    Processing,
    Partial(Value),
    Complete(Value),
    Fail(String),
}

#[derive(Debug, Clone)]
struct SimRequest {
    url: String,
    status: String,
    headers: Option<Value>,
    partial: Option<Value>,
    result: Option<Value>,
    error: Option<String>,
    started: Instant,
    finished_at: Option<Instant>,
}

impl SimRequest {
    fn is_finished(&self) -> bool {
        self.status == "completed" || self.status == "error"
    }

    fn complete(&mut self, result: Value) {
        self.status = "completed".into();
        self.result = Some(result);
        self.finished_at = Some(Instant::now());
    }
}

#[derive(Debug, Clone)]
struct CachedResponse {
    owner: String,
    partial: bool,
    headers: Option<Value>,
    data: Option<Value>,
    /// Set once the listener has announced this entry.
    notified: bool,
    /// Set once a forced check has acted on this entry.
    processed: bool,
}

impl CachedResponse {
    fn new(owner: &str, headers: Option<Value>, data: Option<Value>) -> Self {
        Self {
            owner: owner.to_string(),
            partial: data.is_none(),
            headers,
            data,
            notified: false,
            processed: false,
        }
    }
}

/// Which optional host entry points are present and how the host behaves.
#[derive(Debug, Clone, Copy)]
struct Features {
    start: bool,
    promise: bool,
    listener: bool,
    notify: bool,
    cache: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            start: true,
            promise: true,
            listener: true,
            notify: true,
            cache: true,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    requests: DashMap<String, SimRequest>,
    lookup: DashMap<String, CachedResponse>,
    plans: DashMap<String, Vec<Step>>,
    notifier: OnceLock<Notifier>,
    features: Features,
    forced_checks: AtomicUsize,
    notifications: AtomicUsize,
}

impl Inner {
    fn notify(&self, id: &str) {
        if !self.features.notify {
            return;
        }
        if let Some(notifier) = self.notifier.get() {
            self.notifications.fetch_add(1, Ordering::Relaxed);
            notifier.notify_request_complete(id);
        }
    }

    fn apply(&self, id: &str, step: &Step) {
        let (url, headers) = {
            let Some(mut req) = self.requests.get_mut(id) else {
                return;
            };
            match step {
                Step::Wait(_) => return,
                Step::Headers {
                    status,
                    content_length,
                } => {
                    req.status = "headers_received".into();
                    req.headers = Some(json!({
                        "status": status,
                        "contentLength": content_length,
                    }));
                }
                Step::Processing => req.status = "processing".into(),
                Step::Partial(value) => {
                    req.status = "partial_result".into();
                    req.partial = Some(value.clone());
                }
                Step::Complete(value) => req.complete(value.clone()),
                Step::Fail(message) => {
                    req.status = "error".into();
                    req.error = Some(message.clone());
                    req.finished_at = Some(Instant::now());
                }
            }
            tracing::trace!(request_id = %id, status = %req.status, "Simulated status change");
            (req.url.clone(), req.headers.clone())
        };

        if self.features.cache {
            match step {
                Step::Headers { .. } => {
                    self.lookup.insert(url, CachedResponse::new(id, headers, None));
                }
                Step::Complete(value) => {
                    self.lookup
                        .insert(url, CachedResponse::new(id, headers, Some(value.clone())));
                }
                _ => {}
            }
        }

        self.notify(id);
    }
}

/// Scriptable host implementation.
#[derive(Debug, Clone, Default)]
pub struct SimulatedHost {
    inner: Arc<Inner>,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_features(self, edit: impl FnOnce(&mut Features)) -> Self {
        let mut features = self.inner.features;
        edit(&mut features);
        Self {
            inner: Arc::new(Inner {
                features,
                ..Inner::default()
            }),
        }
    }

    /// Host without the `startApiRequest` entry point.
    pub fn without_start_request(self) -> Self {
        self.with_features(|f| f.start = false)
    }

    /// Host without `waitUntilRequestComplete`.
    pub fn without_promise(self) -> Self {
        self.with_features(|f| f.promise = false)
    }

    /// Host without `registerWasmStatusListener`.
    pub fn without_listener(self) -> Self {
        self.with_features(|f| f.listener = false)
    }

    /// Host that never calls back; completion is only visible by polling.
    pub fn silent(self) -> Self {
        self.with_features(|f| f.notify = false)
    }

    /// Host that does not populate the per-URL response cache.
    pub fn without_response_cache(self) -> Self {
        self.with_features(|f| f.cache = false)
    }

    /// Install the inbound completion callback. Only the first call counts.
    pub fn set_notifier(&self, notifier: Notifier) -> bool {
        self.inner.notifier.set(notifier).is_ok()
    }

    /// Script the next requests started for `url`.
    pub fn plan(&self, url: impl Into<String>, steps: Vec<Step>) {
        self.inner.plans.insert(url.into(), steps);
    }

    /// Apply a step to a started request immediately.
    pub fn apply(&self, id: &str, step: Step) {
        self.inner.apply(id, &step);
    }

    /// Fire the inbound callback for a request without changing its state.
    pub fn notify(&self, id: &str) {
        self.inner.notify(id);
    }

    pub fn forced_checks(&self) -> usize {
        self.inner.forced_checks.load(Ordering::Relaxed)
    }

    pub fn notifications(&self) -> usize {
        self.inner.notifications.load(Ordering::Relaxed)
    }

    pub fn request_count(&self) -> usize {
        self.inner.requests.len()
    }

    /// Most recently started request ID for `url`, if any.
    pub fn request_id_for(&self, url: &str) -> Option<String> {
        self.inner
            .requests
            .iter()
            .filter(|r| r.value().url == url)
            .max_by_key(|r| r.value().started)
            .map(|r| r.key().clone())
    }

    /// Forget requests that finished more than five minutes ago, along with
    /// the cached responses they produced. Returns how many were evicted.
    pub fn evict_finished(&self) -> usize {
        let before = self.inner.requests.len();
        self.inner.requests.retain(|_, req| {
            req.finished_at
                .map_or(true, |at| at.elapsed() <= FINISHED_RETENTION)
        });
        let evicted = before.saturating_sub(self.inner.requests.len());

        let live: HashSet<String> = self.inner.requests.iter().map(|r| r.key().clone()).collect();
        self.inner.lookup.retain(|_, cached| live.contains(&cached.owner));

        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.inner.requests.len(), "Evicted finished requests");
        }
        evicted
    }

    fn spawn_driver(&self, id: String, steps: Vec<Step>) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            for step in steps {
                match step {
                    Step::Wait(delay) => sleep(delay).await,
                    other => inner.apply(&id, &other),
                }
            }
        });
    }
}

impl Host for SimulatedHost {
    fn start_api_request(&self, url: &str, _token: &str, options: &Value) -> Result<String, HostError> {
        if !self.inner.features.start {
            return Err(HostError::Missing("startApiRequest"));
        }

        self.evict_finished();
        // A new request for this URL must not see an earlier response.
        if self.inner.lookup.remove(url).is_some() {
            tracing::trace!(url = %url, "Discarded stale cached response");
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.inner.requests.insert(
            id.clone(),
            SimRequest {
                url: url.to_string(),
                status: "pending".into(),
                headers: None,
                partial: None,
                result: None,
                error: None,
                started: Instant::now(),
                finished_at: None,
            },
        );
        tracing::debug!(request_id = %id, url = %url, ?options, "Simulated request started");

        let steps = self
            .inner
            .plans
            .get(url)
            .map(|plan| plan.value().clone())
            .unwrap_or_default();
        if !steps.is_empty() {
            self.spawn_driver(id.clone(), steps);
        }
        Ok(id)
    }

    fn register_status_listener(&self, id: &str) -> Result<bool, HostError> {
        if !self.inner.features.listener {
            return Err(HostError::Missing("registerWasmStatusListener"));
        }
        let Some(url) = self.inner.requests.get(id).map(|r| r.url.clone()) else {
            return Ok(false);
        };

        let inner = self.inner.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            let started = Instant::now();
            loop {
                sleep(LISTENER_INTERVAL).await;

                let fresh = match inner.lookup.get_mut(&url) {
                    Some(mut cached) if !cached.notified => {
                        cached.notified = true;
                        true
                    }
                    _ => false,
                };
                if fresh {
                    inner.notify(&id);
                }

                let finished = inner
                    .requests
                    .get(&id)
                    .map(|r| r.is_finished())
                    .unwrap_or(true);
                if finished || started.elapsed() > LISTENER_LIFETIME {
                    break;
                }
            }
        });
        Ok(true)
    }

    fn wait_until_request_complete(&self, id: &str, timeout: Duration) -> Option<CompletionPromise> {
        if !self.inner.features.promise {
            return None;
        }
        let inner = self.inner.clone();
        let id = id.to_string();
        Some(Box::pin(async move {
            let started = Instant::now();
            loop {
                {
                    let Some(req) = inner.requests.get(&id) else {
                        return Err(format!("Request #{id} not found in tracker"));
                    };
                    match req.status.as_str() {
                        "completed" => return Ok(()),
                        "error" => {
                            return Err(req
                                .error
                                .clone()
                                .unwrap_or_else(|| "Unknown request error".to_string()))
                        }
                        _ => {}
                    }
                }
                if started.elapsed() > timeout {
                    return Err(format!("Request timed out after {}ms", timeout.as_millis()));
                }
                sleep(PROMISE_CHECK_INTERVAL).await;
            }
        }))
    }

    fn check_request_status(&self, id: &str) -> Value {
        let Some(mut req) = self.inner.requests.get_mut(id) else {
            return json!({ "status": "not_found" });
        };

        // A pending request whose response already sits in the cache is
        // promoted. A complete response is consumed by the promotion.
        if req.status == "pending" {
            let cached = self.inner.lookup.get(&req.url).map(|c| c.value().clone());
            if let Some(cached) = cached {
                if cached.partial {
                    req.status = "headers_received".into();
                    req.headers = cached.headers;
                } else if let Some(data) = cached.data {
                    req.complete(data);
                    self.inner.lookup.remove(&req.url);
                }
            }
        }

        let mut out = json!({
            "status": req.status,
            "url": req.url,
            "elapsedMs": req.started.elapsed().as_secs_f64() * 1000.0,
        });
        match req.status.as_str() {
            "headers_received" => {
                out["headers"] = req.headers.clone().unwrap_or(Value::Null);
                out["partial"] = Value::Bool(true);
            }
            "partial_result" => out["partialResult"] = req.partial.clone().unwrap_or(Value::Null),
            "completed" => out["result"] = req.result.clone().unwrap_or(Value::Null),
            _ => {}
        }
        if let Some(error) = &req.error {
            out["error"] = Value::String(error.clone());
        }
        out
    }

    fn check_fetch_request_status(&self, id: &str) -> Value {
        let Some(req) = self.inner.requests.get(id) else {
            return json!({ "completed": false });
        };
        match req.status.as_str() {
            "completed" => json!({ "completed": true, "success": true, "data": req.result }),
            "error" => json!({ "completed": true, "success": false, "error": req.error }),
            _ => json!({ "completed": false }),
        }
    }

    fn check_response_lookup(&self, url: &str) -> Value {
        match self.inner.lookup.get(url) {
            Some(cached) => json!({
                "exists": true,
                "partial": cached.partial,
                "complete": !cached.partial && cached.data.is_some(),
            }),
            None => Value::Null,
        }
    }

    fn force_request_status_check(&self, id: &str) -> bool {
        self.inner.forced_checks.fetch_add(1, Ordering::Relaxed);

        let promoted = {
            let Some(mut req) = self.inner.requests.get_mut(id) else {
                tracing::debug!(request_id = %id, "Force status check for unknown request");
                return false;
            };
            let Some(mut cached) = self.inner.lookup.get_mut(&req.url) else {
                return false;
            };
            if cached.processed {
                return false;
            }
            cached.processed = true;
            match cached.data.clone() {
                Some(data) if !cached.partial && req.status != "completed" => {
                    req.complete(data);
                    true
                }
                _ => false,
            }
        };
        if promoted {
            tracing::warn!(request_id = %id, "Force status check found completed response");
            self.inner.notify(id);
        }
        promoted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FetchStatus, LookupResult, StatusKind, StatusSnapshot};
    use crate::notify::NotificationRegistry;

    #[tokio::test]
    async fn test_missing_start_request() {
        let host = SimulatedHost::new().without_start_request();
        assert_eq!(
            host.start_api_request("/x", "t", &Value::Null),
            Err(HostError::Missing("startApiRequest"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_request() {
        let host = SimulatedHost::new();
        host.plan(
            "/locations",
            vec![
                Step::Wait(Duration::from_millis(50)),
                Step::Headers {
                    status: 200,
                    content_length: Some(10),
                },
                Step::Wait(Duration::from_millis(50)),
                Step::Complete(json!({ "ok": true })),
            ],
        );
        let id = host.start_api_request("/locations", "t", &Value::Null).unwrap();
        assert_eq!(
            StatusSnapshot::parse(&host.check_request_status(&id)).kind,
            StatusKind::Pending
        );

        sleep(Duration::from_millis(75)).await;
        let snapshot = StatusSnapshot::parse(&host.check_request_status(&id));
        assert_eq!(snapshot.kind, StatusKind::HeadersReceived);
        assert!(LookupResult::parse(&host.check_response_lookup("/locations")).partial);

        sleep(Duration::from_millis(50)).await;
        assert_eq!(
            FetchStatus::parse(&host.check_fetch_request_status(&id)),
            FetchStatus::Succeeded(json!({ "ok": true }))
        );
        assert!(LookupResult::parse(&host.check_response_lookup("/locations")).complete);
    }

    #[tokio::test]
    async fn test_notifies_registered_tracker() {
        let registry = Arc::new(NotificationRegistry::new());
        let host = SimulatedHost::new();
        assert!(host.set_notifier(Notifier::new(registry.clone())));

        let id = host.start_api_request("/a", "t", &Value::Null).unwrap();
        let (tx, mut rx) = crate::notify::signal_channel();
        registry.register(&id, tx).unwrap();

        host.apply(&id, Step::Processing);
        assert!(rx.try_recv().is_ok());
        assert_eq!(host.notifications(), 1);
    }

    #[tokio::test]
    async fn test_silent_host_never_notifies() {
        let registry = Arc::new(NotificationRegistry::new());
        let host = SimulatedHost::new().silent();
        host.set_notifier(Notifier::new(registry.clone()));

        let id = host.start_api_request("/a", "t", &Value::Null).unwrap();
        let (tx, mut rx) = crate::notify::signal_channel();
        registry.register(&id, tx).unwrap();

        host.apply(&id, Step::Complete(json!(1)));
        assert!(rx.try_recv().is_err());
        assert_eq!(host.notifications(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_promise_rejects_on_error() {
        let host = SimulatedHost::new();
        let id = host.start_api_request("/a", "t", &Value::Null).unwrap();
        let promise = host
            .wait_until_request_complete(&id, Duration::from_secs(5))
            .unwrap();
        host.apply(&id, Step::Fail("boom".into()));
        assert_eq!(promise.await, Err("boom".to_string()));
    }

    #[tokio::test]
    async fn test_force_check_shares_response_with_concurrent_request() {
        let host = SimulatedHost::new();
        let first = host.start_api_request("/same", "t", &Value::Null).unwrap();
        let second = host.start_api_request("/same", "t", &Value::Null).unwrap();
        host.apply(&first, Step::Complete(json!("body")));

        assert!(host.force_request_status_check(&second));
        assert_eq!(
            FetchStatus::parse(&host.check_fetch_request_status(&second)),
            FetchStatus::Succeeded(json!("body"))
        );
        // processed entries are acted on once
        assert!(!host.force_request_status_check(&second));
        assert!(!host.force_request_status_check("missing"));
        assert_eq!(host.forced_checks(), 3);
    }

    #[tokio::test]
    async fn test_finished_response_never_completes_later_request() {
        let host = SimulatedHost::new();
        let first = host.start_api_request("/same", "t", &Value::Null).unwrap();
        host.apply(&first, Step::Complete(json!("first")));

        let later = host.start_api_request("/same", "t", &Value::Null).unwrap();
        assert!(host.check_response_lookup("/same").is_null());
        assert!(!host.force_request_status_check(&later));
        assert_eq!(
            StatusSnapshot::parse(&host.check_request_status(&later)).kind,
            StatusKind::Pending
        );
    }

    #[tokio::test]
    async fn test_promotion_consumes_cached_response() {
        let host = SimulatedHost::new();
        let first = host.start_api_request("/same", "t", &Value::Null).unwrap();
        let second = host.start_api_request("/same", "t", &Value::Null).unwrap();
        let third = host.start_api_request("/same", "t", &Value::Null).unwrap();
        host.apply(&first, Step::Complete(json!("body")));

        let snapshot = StatusSnapshot::parse(&host.check_request_status(&second));
        assert_eq!(snapshot.kind, StatusKind::Completed);
        assert_eq!(snapshot.result, Some(json!("body")));

        assert!(host.check_response_lookup("/same").is_null());
        assert_eq!(
            StatusSnapshot::parse(&host.check_request_status(&third)).kind,
            StatusKind::Pending
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicts_finished_requests() {
        let host = SimulatedHost::new();
        let done = host.start_api_request("/a", "t", &Value::Null).unwrap();
        let _open = host.start_api_request("/b", "t", &Value::Null).unwrap();
        host.apply(&done, Step::Complete(json!(1)));

        sleep(Duration::from_secs(200)).await;
        assert_eq!(host.evict_finished(), 0);

        sleep(Duration::from_secs(101)).await;
        assert_eq!(host.evict_finished(), 1);
        assert_eq!(host.request_count(), 1);
        assert!(host.check_response_lookup("/a").is_null());
    }
}
