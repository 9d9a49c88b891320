//! Error kinds surfaced by a tracked request.

use std::time::Duration;

use thiserror::Error;

use crate::host::HostError;
use crate::notify::RegistryError;

/// Errors that end a tracked request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// A required host function is missing; nothing was registered.
    #[error("initialization error: {0}")]
    Initialization(String),

    /// The time budget ran out before a terminal status was observed.
    #[error("request {request_id} timed out after {elapsed:?} (budget {budget:?})")]
    Timeout {
        request_id: String,
        elapsed: Duration,
        budget: Duration,
    },

    /// The host reported a failure. The message is the host's, verbatim.
    #[error("{0}")]
    External(String),

    /// The host reused an in-flight request ID.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl RequestError {
    /// Short label used for metrics and logs.
    pub fn outcome(&self) -> &'static str {
        match self {
            RequestError::Initialization(_) => "initialization_error",
            RequestError::Timeout { .. } => "timeout",
            RequestError::External(_) => "error",
            RequestError::Registry(_) => "registry_error",
        }
    }
}

impl From<HostError> for RequestError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::Missing(_) => RequestError::Initialization(err.to_string()),
            HostError::Rejected(message) => RequestError::External(message),
        }
    }
}

/// Result type for tracked requests.
pub type RequestResult<T> = Result<T, RequestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RequestError::External("API returned status 500: oops".into());
        assert_eq!(err.to_string(), "API returned status 500: oops");

        let err = RequestError::from(HostError::Missing("startApiRequest"));
        assert_eq!(
            err.to_string(),
            "initialization error: host function startApiRequest is not available"
        );
        assert_eq!(err.outcome(), "initialization_error");

        let err = RequestError::Timeout {
            request_id: "9".into(),
            elapsed: Duration::from_millis(1500),
            budget: Duration::from_secs(1),
        };
        assert!(err.to_string().starts_with("request 9 timed out after 1.5s"));
    }
}
