//! Notification subsystem.
//!
//! # Data Flow
//! ```text
//! host callback (any yield point)
//!     → Notifier::notify_request_complete(id)
//!     → registry.rs (mutex-guarded lookup, try_send into capacity-1 slot)
//!     → RequestState.notify_rx
//!
//! poll loop
//!     → fan_in.rs (lookup, promise, notify, bounded wait)
//!     → bool "something happened"
//! ```
//!
//! # Design Decisions
//! - Every send is non-blocking; a full slot already means "look again"
//! - The only blocking wait is bounded (≤ 5ms by config validation)

pub mod fan_in;
pub mod registry;

pub use fan_in::{check_for_notifications, NotificationSource};
pub use registry::{signal_channel, NotificationRegistry, Notifier, RegistryError, SignalOutcome};
