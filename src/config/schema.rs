//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the tracker.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the request tracker.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TrackerConfig {
    /// Poll cadence and notification wait settings.
    pub polling: PollingConfig,

    /// Time budget settings.
    pub budget: BudgetConfig,

    /// Same-origin proxy rewrite settings.
    pub proxy: ProxyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// One step of the time-based poll interval backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackoffStep {
    /// Elapsed time after which the step applies, in seconds.
    pub after_secs: u64,

    /// Poll interval used once the step applies, in milliseconds.
    pub interval_ms: u64,
}

/// Poll loop cadence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Sleep between iterations right after initiation, in milliseconds.
    pub initial_interval_ms: u64,

    /// Interval forced by header/processing/partial-result statuses.
    pub active_interval_ms: u64,

    /// How long a status-driven reset takes precedence over the
    /// time-based backoff, in milliseconds.
    pub reset_hold_ms: u64,

    /// Time-based backoff steps, applied in order; the last match wins.
    pub backoff_steps: Vec<BackoffStep>,

    /// Period of the proactive host status recheck, in seconds.
    pub force_check_every_secs: u64,

    /// Upper bound of the blocking wait in the notification fan-in.
    pub notification_wait_ms: u64,

    /// Minimum gap between two status log lines for one request.
    pub log_every_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 100,
            active_interval_ms: 250,
            reset_hold_ms: 2_000,
            // The 10s threshold appears twice on purpose; the second step
            // overrides the first.
            backoff_steps: vec![
                BackoffStep { after_secs: 10, interval_ms: 500 },
                BackoffStep { after_secs: 10, interval_ms: 1_000 },
                BackoffStep { after_secs: 30, interval_ms: 2_000 },
            ],
            force_check_every_secs: 10,
            notification_wait_ms: 5,
            log_every_secs: 5,
        }
    }
}

impl PollingConfig {
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn active_interval(&self) -> Duration {
        Duration::from_millis(self.active_interval_ms)
    }

    pub fn reset_hold(&self) -> Duration {
        Duration::from_millis(self.reset_hold_ms)
    }

    pub fn notification_wait(&self) -> Duration {
        Duration::from_millis(self.notification_wait_ms)
    }
}

/// Time budget configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Budget a request starts with, in seconds.
    pub initial_wait_secs: u64,

    /// Budget granted from "now" once a 200 header arrives.
    pub header_baseline_secs: u64,

    /// Extra budget for payloads above `large_payload_threshold_bytes`.
    pub large_payload_extra_secs: u64,

    /// Content length above which a payload counts as large.
    pub large_payload_threshold_bytes: u64,

    /// Minimum remaining budget after a processing or partial-result status.
    pub progress_extension_secs: u64,

    /// Fixed budget of the simple fetch variant, in seconds.
    pub fetch_timeout_secs: u64,

    /// Timeout handed to the host's completion promise, in milliseconds.
    pub promise_timeout_ms: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            initial_wait_secs: 30,
            header_baseline_secs: 60,
            large_payload_extra_secs: 180,
            large_payload_threshold_bytes: 100_000,
            progress_extension_secs: 60,
            fetch_timeout_secs: 30,
            promise_timeout_ms: 30_000,
        }
    }
}

impl BudgetConfig {
    pub fn initial_wait(&self) -> Duration {
        Duration::from_secs(self.initial_wait_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn promise_timeout(&self) -> Duration {
        Duration::from_millis(self.promise_timeout_ms)
    }
}

/// Same-origin proxy rewrite configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Rewrite absolute URLs to a same-origin proxy path.
    pub enabled: bool,

    /// Path prefix the proxy is mounted under (e.g. "/proxy").
    pub path_prefix: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path_prefix: String::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
