//! Request ID → signal channel registry.
//!
//! # Responsibilities
//! - Hold the sending half of each in-flight request's notify channel
//! - Deliver host callbacks without blocking (`try_send`)
//! - Forget a request once its owner cleans up
//!
//! # Design Decisions
//! - One `std::sync::Mutex` around the map, held only for the duration of a
//!   lookup; never across an await point
//! - A full slot means a signal is already pending, so extra signals are
//!   dropped (at-least-once is enough)

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::observability::metrics;

/// Errors raised by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The host handed out an ID that is still in flight.
    #[error("request ID {0} is already registered")]
    Duplicate(String),
}

/// Create a single-slot signal channel.
pub fn signal_channel() -> (mpsc::Sender<()>, mpsc::Receiver<()>) {
    mpsc::channel(1)
}

/// What happened to a signal handed to [`NotificationRegistry::try_signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The slot was empty and now holds the signal.
    Delivered,
    /// A signal was already pending; this one was dropped.
    AlreadyPending,
    /// The receiving side is gone.
    Closed,
    /// No request with that ID is registered.
    Unknown,
}

/// Mutex-guarded map from request ID to signal sender.
#[derive(Debug, Default)]
pub struct NotificationRegistry {
    channels: Mutex<HashMap<String, mpsc::Sender<()>>>,
}

impl NotificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, mpsc::Sender<()>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the sender for a request.
    pub fn register(&self, id: &str, sender: mpsc::Sender<()>) -> Result<(), RegistryError> {
        let mut channels = self.lock();
        if channels.contains_key(id) {
            return Err(RegistryError::Duplicate(id.to_string()));
        }
        channels.insert(id.to_string(), sender);
        metrics::record_registry_size(channels.len());
        tracing::trace!(request_id = %id, registered = channels.len(), "Registered notify channel");
        Ok(())
    }

    /// Signal a request without blocking.
    pub fn try_signal(&self, id: &str) -> SignalOutcome {
        let channels = self.lock();
        let Some(sender) = channels.get(id) else {
            return SignalOutcome::Unknown;
        };
        match sender.try_send(()) {
            Ok(()) => SignalOutcome::Delivered,
            Err(mpsc::error::TrySendError::Full(())) => SignalOutcome::AlreadyPending,
            Err(mpsc::error::TrySendError::Closed(())) => SignalOutcome::Closed,
        }
    }

    /// Remove a request. Returns true if it was registered.
    pub fn unregister(&self, id: &str) -> bool {
        let mut channels = self.lock();
        let removed = channels.remove(id).is_some();
        if removed {
            metrics::record_registry_size(channels.len());
            tracing::trace!(request_id = %id, registered = channels.len(), "Unregistered notify channel");
        }
        removed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Inbound completion callback handed to the host.
///
/// The host calls [`Notifier::notify_request_complete`] whenever a request's
/// status changes; the call may land at any yield point of the poll loop.
#[derive(Debug, Clone)]
pub struct Notifier {
    registry: Arc<NotificationRegistry>,
}

impl Notifier {
    pub fn new(registry: Arc<NotificationRegistry>) -> Self {
        Self { registry }
    }

    pub fn notify_request_complete(&self, id: &str) -> SignalOutcome {
        let outcome = self.registry.try_signal(id);
        match outcome {
            SignalOutcome::Delivered => {
                tracing::debug!(request_id = %id, "Completion notification delivered");
            }
            SignalOutcome::AlreadyPending => {
                tracing::trace!(request_id = %id, "Notification already pending, dropped");
            }
            SignalOutcome::Closed | SignalOutcome::Unknown => {
                tracing::debug!(request_id = %id, ?outcome, "Notification for untracked request ignored");
            }
        }
        outcome
    }
}
