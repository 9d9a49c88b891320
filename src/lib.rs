//! Completion tracking for long-running, host-proxied requests.
//!
//! Bridges a cooperatively scheduled caller with a host event loop that
//! reports progress through callbacks, promises and polled status objects.

pub mod config;
pub mod error;
pub mod host;
pub mod notify;
pub mod observability;
pub mod poller;
pub mod request;
pub mod tracker;

pub use config::TrackerConfig;
pub use error::{RequestError, RequestResult};
pub use host::{Host, SimulatedHost};
pub use notify::Notifier;
pub use request::{RequestState, TrackedRequest};
pub use tracker::RequestTracker;
