//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! registry, fan-in, poller produce:
//!     → logging.rs (structured log events, request_id on every line)
//!     → metrics.rs (counters, gauges, histograms)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through all log events
//! - Metrics are cheap (facade calls, no-op without a recorder)
//! - Status logging never mutates request state

pub mod logging;
pub mod metrics;
