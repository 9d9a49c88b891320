//! Request cleanup.
//!
//! [`TrackedRequest`] owns a [`RequestState`] for the duration of its poll
//! loop and releases the registry entry and both channels when dropped, so
//! every exit path (success, error, timeout, or the future being dropped)
//! cleans up exactly once.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::notify::NotificationRegistry;
use crate::request::state::RequestState;

impl RequestState {
    /// Unregister the request and close its channels.
    ///
    /// Idempotent: returns false if the request was already cleaned up.
    pub fn cleanup(&mut self, registry: &NotificationRegistry) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;

        registry.unregister(&self.request_id);
        self.notify_rx.close();
        if let Some(rx) = self.promise_rx.as_mut() {
            rx.close();
        }
        if let Some(task) = self.promise_task.take() {
            task.abort();
        }

        tracing::debug!(
            request_id = %self.request_id,
            elapsed_ms = self.elapsed().as_millis() as u64,
            completed = self.completed,
            "Request cleaned up"
        );
        true
    }
}

/// RAII guard around an in-flight request.
#[derive(Debug)]
pub struct TrackedRequest {
    state: RequestState,
    registry: Arc<NotificationRegistry>,
}

impl TrackedRequest {
    pub fn new(state: RequestState, registry: Arc<NotificationRegistry>) -> Self {
        Self { state, registry }
    }

    /// Clean up now instead of on drop.
    pub fn cleanup(&mut self) -> bool {
        self.state.cleanup(&self.registry)
    }
}

impl Deref for TrackedRequest {
    type Target = RequestState;
    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl DerefMut for TrackedRequest {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.state
    }
}

impl Drop for TrackedRequest {
    fn drop(&mut self) {
        self.state.cleanup(&self.registry);
    }
}
