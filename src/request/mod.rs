//! Request lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! url, token, options
//!     → proxy_url.rs (same-origin rewrite)
//!     → initiator.rs (host start, registry entry, promise wiring)
//!     → RequestState (state.rs), wrapped in TrackedRequest
//!     → poller mutates it
//!     → cleanup.rs (Drop: unregister, close channels)
//! ```

pub mod cleanup;
pub mod initiator;
pub mod proxy_url;
pub mod state;

pub use cleanup::TrackedRequest;
pub use initiator::initiate;
pub use proxy_url::proxy_url;
pub use state::RequestState;
