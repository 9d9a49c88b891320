//! Status poller subsystem.
//!
//! # Data Flow
//! ```text
//! TrackedRequest
//!     → machine.rs (stateful loop over checkRequestStatus)
//!         → handlers.rs (headers / processing / partial result)
//!         → interval.rs (backoff, forced recheck, status log)
//!     → fetch.rs (fixed budget loop over checkFetchRequestStatus)
//! ```
//!
//! # Design Decisions
//! - The loop owns the request state; handlers borrow it mutably
//! - The inter-iteration sleep is the cooperative yield point
//! - No internal retries; every error returns to the caller

pub mod fetch;
pub mod handlers;
pub mod interval;
pub mod machine;

pub use fetch::wait_for_fetch;
pub use machine::poll_until_complete;
