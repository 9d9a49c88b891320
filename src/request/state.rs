//! Per-request lifecycle record.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::host::StatusSnapshot;

/// State of one in-flight request.
///
/// Owned by its poll loop; nothing outside that loop mutates it. The budget
/// (`max_wait`) is measured from `start_time` and can only grow.
#[derive(Debug)]
pub struct RequestState {
    pub request_id: String,
    /// Logical address before the proxy rewrite.
    pub url: String,
    /// Address handed to the host.
    pub proxied_url: String,
    pub start_time: Instant,
    max_wait: Duration,
    pub poll_interval: Duration,
    header_received: bool,

    pub(crate) notify_rx: mpsc::Receiver<()>,
    pub(crate) promise_rx: Option<mpsc::Receiver<()>>,
    pub(crate) promise_task: Option<JoinHandle<()>>,

    pub last_status: Option<StatusSnapshot>,
    pub completed: bool,
    pub error: Option<String>,
    pub result: Option<Value>,

    pub(crate) last_status_reset: Option<Instant>,
    pub(crate) forced_checks: u64,
    pub(crate) closed: bool,
}

impl RequestState {
    pub(crate) fn new(
        request_id: String,
        url: String,
        proxied_url: String,
        max_wait: Duration,
        poll_interval: Duration,
        notify_rx: mpsc::Receiver<()>,
    ) -> Self {
        Self {
            request_id,
            url,
            proxied_url,
            start_time: Instant::now(),
            max_wait,
            poll_interval,
            header_received: false,
            notify_rx,
            promise_rx: None,
            promise_task: None,
            last_status: None,
            completed: false,
            error: None,
            result: None,
            last_status_reset: None,
            forced_checks: 0,
            closed: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Instant after which the request counts as timed out.
    pub fn deadline(&self) -> Instant {
        self.start_time + self.max_wait
    }

    pub fn is_timed_out(&self) -> bool {
        self.elapsed() > self.max_wait
    }

    pub fn remaining(&self) -> Duration {
        self.max_wait.saturating_sub(self.elapsed())
    }

    /// Make sure at least `at_least` remains from now. Never shrinks the
    /// budget; returns true if it grew.
    pub fn extend_max_wait(&mut self, at_least: Duration) -> bool {
        let target = self.elapsed() + at_least;
        if target > self.max_wait {
            self.max_wait = target;
            true
        } else {
            false
        }
    }

    pub fn header_received(&self) -> bool {
        self.header_received
    }

    /// Consume the one-shot header guard. Returns false if already taken.
    pub(crate) fn take_header_guard(&mut self) -> bool {
        !std::mem::replace(&mut self.header_received, true)
    }

    pub fn has_promise(&self) -> bool {
        self.promise_rx.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::signal_channel;

    fn state(max_wait: Duration) -> RequestState {
        let (_tx, rx) = signal_channel();
        RequestState::new(
            "1".into(),
            "https://example.com/a".into(),
            "/a?base=example.com".into(),
            max_wait,
            Duration::from_millis(100),
            rx,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_extend_never_shrinks() {
        let mut s = state(Duration::from_secs(120));
        assert!(!s.extend_max_wait(Duration::from_secs(60)));
        assert_eq!(s.max_wait(), Duration::from_secs(120));

        tokio::time::advance(Duration::from_secs(100)).await;
        assert!(s.extend_max_wait(Duration::from_secs(60)));
        assert_eq!(s.max_wait(), Duration::from_secs(160));
        assert_eq!(s.remaining(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_strictly_after_budget() {
        let s = state(Duration::ZERO);
        assert!(!s.is_timed_out());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(s.is_timed_out());
    }

    #[tokio::test]
    async fn test_header_guard_is_one_shot() {
        let mut s = state(Duration::from_secs(1));
        assert!(s.take_header_guard());
        assert!(!s.take_header_guard());
        assert!(s.header_received());
    }
}
