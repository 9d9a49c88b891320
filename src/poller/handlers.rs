//! Status transition handlers.
//!
//! Each handler adjusts the budget and cadence of a request in response to
//! one non-terminal status. None of them ever shrinks `max_wait`.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::TrackerConfig;
use crate::host::HeaderInfo;
use crate::request::RequestState;

/// `headers_received`: on a 200 with a known content length, grant a fresh
/// budget sized for the payload and tighten the poll interval.
///
/// Runs at most once per request; returns true if it fired.
pub fn handle_headers_received(
    state: &mut RequestState,
    headers: Option<HeaderInfo>,
    config: &TrackerConfig,
) -> bool {
    if state.header_received() {
        return false;
    }
    let Some(HeaderInfo {
        status: Some(200),
        content_length: Some(content_length),
    }) = headers
    else {
        return false;
    };
    if !state.take_header_guard() {
        return false;
    }

    let budget = &config.budget;
    let mut grant = Duration::from_secs(budget.header_baseline_secs);
    if content_length > budget.large_payload_threshold_bytes {
        grant += Duration::from_secs(budget.large_payload_extra_secs);
    }
    state.extend_max_wait(grant);
    state.poll_interval = config.polling.active_interval();
    state.last_status_reset = Some(Instant::now());

    tracing::info!(
        request_id = %state.request_id,
        content_length,
        max_wait_secs = state.max_wait().as_secs(),
        "Headers received"
    );
    true
}

/// `processing`: tighten the poll interval and keep at least the progress
/// extension in the budget.
pub fn handle_processing(state: &mut RequestState, config: &TrackerConfig) {
    state.poll_interval = config.polling.active_interval();
    state.last_status_reset = Some(Instant::now());
    let extended = state.extend_max_wait(Duration::from_secs(config.budget.progress_extension_secs));
    tracing::debug!(request_id = %state.request_id, extended, "Request processing");
}

/// `partial_result`: same budget policy as processing. The partial payload
/// stays in `last_status` and is never taken as the result.
pub fn handle_partial_result(state: &mut RequestState, config: &TrackerConfig) {
    let extended = state.extend_max_wait(Duration::from_secs(config.budget.progress_extension_secs));
    tracing::debug!(request_id = %state.request_id, extended, "Partial result received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::signal_channel;

    fn state() -> RequestState {
        let (_tx, rx) = signal_channel();
        RequestState::new(
            "h".into(),
            "/h".into(),
            "/h".into(),
            Duration::from_secs(30),
            Duration::from_millis(100),
            rx,
        )
    }

    fn ok(content_length: u64) -> Option<HeaderInfo> {
        Some(HeaderInfo {
            status: Some(200),
            content_length: Some(content_length),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_large_payload_budget() {
        let config = TrackerConfig::default();
        let mut s = state();
        assert!(handle_headers_received(&mut s, ok(500_000), &config));
        assert!(s.max_wait() >= Duration::from_secs(180));
        assert_eq!(s.max_wait(), Duration::from_secs(240));
        assert_eq!(s.poll_interval, Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_small_payload_budget() {
        let config = TrackerConfig::default();
        let mut s = state();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(handle_headers_received(&mut s, ok(1_000), &config));
        assert_eq!(s.max_wait(), Duration::from_secs(65));
    }

    #[tokio::test(start_paused = true)]
    async fn test_header_fast_path_once() {
        let config = TrackerConfig::default();
        let mut s = state();
        assert!(handle_headers_received(&mut s, ok(10), &config));
        let first = s.max_wait();

        tokio::time::advance(Duration::from_secs(50)).await;
        s.poll_interval = Duration::from_secs(1);
        assert!(!handle_headers_received(&mut s, ok(500_000), &config));
        assert_eq!(s.max_wait(), first);
        assert_eq!(s.poll_interval, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_headers_need_status_and_length() {
        let config = TrackerConfig::default();
        let mut s = state();
        let no_length = Some(HeaderInfo {
            status: Some(200),
            content_length: None,
        });
        let not_ok = Some(HeaderInfo {
            status: Some(404),
            content_length: Some(10),
        });
        assert!(!handle_headers_received(&mut s, no_length, &config));
        assert!(!handle_headers_received(&mut s, not_ok, &config));
        assert!(!handle_headers_received(&mut s, None, &config));
        assert!(!s.header_received());
        // a later well-formed header still gets the fast path
        assert!(handle_headers_received(&mut s, ok(10), &config));
    }

    #[tokio::test(start_paused = true)]
    async fn test_processing_resets_interval_and_extends() {
        let config = TrackerConfig::default();
        let mut s = state();
        s.poll_interval = Duration::from_secs(2);
        tokio::time::advance(Duration::from_secs(20)).await;
        handle_processing(&mut s, &config);
        assert_eq!(s.poll_interval, Duration::from_millis(250));
        assert_eq!(s.max_wait(), Duration::from_secs(80));
        assert!(s.last_status_reset.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_results_never_reduce_budget() {
        let config = TrackerConfig::default();
        let mut s = state();
        assert!(handle_headers_received(&mut s, ok(500_000), &config));
        let after_headers = s.max_wait();

        tokio::time::advance(Duration::from_secs(10)).await;
        handle_partial_result(&mut s, &config);
        assert_eq!(s.max_wait(), after_headers);

        tokio::time::advance(Duration::from_secs(200)).await;
        handle_partial_result(&mut s, &config);
        assert_eq!(s.max_wait(), Duration::from_secs(270));
        assert!(s.max_wait() >= after_headers);
    }
}
