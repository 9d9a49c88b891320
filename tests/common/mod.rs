//! Shared utilities for integration tests.

use std::sync::Arc;
use std::time::Duration;

use fetch_tracker::config::TrackerConfig;
use fetch_tracker::host::{SimulatedHost, Step};
use fetch_tracker::RequestTracker;

/// A tracker wired to a simulated host.
pub struct Harness {
    pub sim: SimulatedHost,
    pub tracker: RequestTracker,
}

/// Build a tracker around `sim` and install its callback.
pub fn harness(sim: SimulatedHost, config: TrackerConfig) -> Harness {
    let tracker = RequestTracker::new(Arc::new(sim.clone()), config);
    sim.set_notifier(tracker.notifier());
    Harness { sim, tracker }
}

/// Config with the proxy rewrite off, so scripted URLs match what the host sees.
#[allow(dead_code)]
pub fn direct_config() -> TrackerConfig {
    let mut config = TrackerConfig::default();
    config.proxy.enabled = false;
    config
}

#[allow(dead_code)]
pub fn wait_ms(ms: u64) -> Step {
    Step::Wait(Duration::from_millis(ms))
}

#[allow(dead_code)]
pub fn wait_secs(secs: u64) -> Step {
    Step::Wait(Duration::from_secs(secs))
}
