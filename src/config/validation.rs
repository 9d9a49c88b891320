//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, bounded notification wait)
//! - Check backoff steps are ordered
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TrackerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::TrackerConfig;

/// Upper bound for the fan-in blocking wait; anything longer stalls the
/// cooperative loop.
pub const MAX_NOTIFICATION_WAIT_MS: u64 = 5;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("polling.notification_wait_ms must be at most {max}ms, got {actual}ms")]
    WaitTooLong { max: u64, actual: u64 },

    #[error("polling.backoff_steps[{index}] goes back in time ({after_secs}s after {previous_secs}s)")]
    UnorderedBackoff {
        index: usize,
        after_secs: u64,
        previous_secs: u64,
    },

    #[error("proxy.path_prefix must start with '/' and not end with it, got {0:?}")]
    BadPrefix(String),

    #[error("unknown log level {0:?}")]
    LogLevel(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &TrackerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let polling = &config.polling;
    let non_zero = [
        ("polling.initial_interval_ms", polling.initial_interval_ms),
        ("polling.active_interval_ms", polling.active_interval_ms),
        ("polling.force_check_every_secs", polling.force_check_every_secs),
        ("polling.notification_wait_ms", polling.notification_wait_ms),
        ("budget.header_baseline_secs", config.budget.header_baseline_secs),
        ("budget.progress_extension_secs", config.budget.progress_extension_secs),
        ("budget.fetch_timeout_secs", config.budget.fetch_timeout_secs),
    ];
    for (field, value) in non_zero {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if polling.notification_wait_ms > MAX_NOTIFICATION_WAIT_MS {
        errors.push(ValidationError::WaitTooLong {
            max: MAX_NOTIFICATION_WAIT_MS,
            actual: polling.notification_wait_ms,
        });
    }

    for (index, pair) in polling.backoff_steps.windows(2).enumerate() {
        if pair[1].after_secs < pair[0].after_secs {
            errors.push(ValidationError::UnorderedBackoff {
                index: index + 1,
                after_secs: pair[1].after_secs,
                previous_secs: pair[0].after_secs,
            });
        }
    }
    for step in &polling.backoff_steps {
        if step.interval_ms == 0 {
            errors.push(ValidationError::Zero {
                field: "polling.backoff_steps.interval_ms",
            });
        }
    }

    let prefix = &config.proxy.path_prefix;
    if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.ends_with('/')) {
        errors.push(ValidationError::BadPrefix(prefix.clone()));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BackoffStep;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&TrackerConfig::default()).is_ok());
    }

    #[test]
    fn test_duplicate_threshold_is_allowed() {
        let config = TrackerConfig::default();
        assert_eq!(
            config.polling.backoff_steps[0].after_secs,
            config.polling.backoff_steps[1].after_secs
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = TrackerConfig::default();
        config.polling.active_interval_ms = 0;
        config.polling.notification_wait_ms = 50;
        config.polling.backoff_steps = vec![
            BackoffStep { after_secs: 30, interval_ms: 2_000 },
            BackoffStep { after_secs: 10, interval_ms: 500 },
        ];
        config.proxy.path_prefix = "proxy/".into();
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::Zero {
            field: "polling.active_interval_ms"
        }));
        assert!(errors.contains(&ValidationError::WaitTooLong { max: 5, actual: 50 }));
        assert!(errors.contains(&ValidationError::BadPrefix("proxy/".into())));
    }

    #[test]
    fn test_zero_initial_budget_is_allowed() {
        let mut config = TrackerConfig::default();
        config.budget.initial_wait_secs = 0;
        assert!(validate_config(&config).is_ok());
    }
}
