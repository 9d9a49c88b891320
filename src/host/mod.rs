//! Host interface subsystem.
//!
//! # Data Flow
//! ```text
//! tracker / poller
//!     → Host trait (start, status queries, force recheck, completion promise)
//!     → status.rs (fail-closed parsing of the returned objects)
//!
//! host
//!     → Notifier::notify_request_complete (inbound callback)
//! ```
//!
//! # Design Decisions
//! - Status queries return raw `serde_json::Value`; the host is loosely typed
//! - Optional entry points have default implementations reporting absence
//! - Only `start_api_request` is required; its absence fails initiation

pub mod simulated;
pub mod status;

use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

pub use simulated::{SimulatedHost, Step};
pub use status::{FetchStatus, HeaderInfo, LookupResult, StatusKind, StatusSnapshot};

/// Errors reported by host entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The host does not provide this entry point.
    #[error("host function {0} is not available")]
    Missing(&'static str),

    /// The host refused the call.
    #[error("{0}")]
    Rejected(String),
}

/// Completion promise: resolves or rejects once the host considers the
/// request finished. Neither outcome is authoritative.
pub type CompletionPromise = BoxFuture<'static, Result<(), String>>;

/// Functions the host environment provides.
pub trait Host: Send + Sync {
    /// Start an outbound call and return its request ID.
    fn start_api_request(&self, url: &str, token: &str, options: &Value)
        -> Result<String, HostError>;

    /// Ask the host to push notifications for a request more aggressively.
    fn register_status_listener(&self, _id: &str) -> Result<bool, HostError> {
        Err(HostError::Missing("registerWasmStatusListener"))
    }

    /// Promise settling once the request leaves the in-flight states.
    fn wait_until_request_complete(&self, _id: &str, _timeout: Duration) -> Option<CompletionPromise> {
        None
    }

    /// `{status, headers:{contentLength, status}, elapsedMs, partialResult, result, error}`
    fn check_request_status(&self, id: &str) -> Value;

    /// `{completed, success, data, error}`
    fn check_fetch_request_status(&self, id: &str) -> Value;

    /// `{exists, partial, complete}` or null. Must not have side effects.
    fn check_response_lookup(&self, url: &str) -> Value;

    /// Re-derive the request's status from the host's caches.
    fn force_request_status_check(&self, id: &str) -> bool;
}
