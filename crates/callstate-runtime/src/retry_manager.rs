//! Bounded retry with linear backoff

use callstate_core::{CallError, CallOptions};
use std::time::Duration;

/// Classification of errors for retry decision making
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    /// Timeouts, network failures and ordinary failures
    Retryable,
    /// Abandoned attempts; retrying would resurrect work the caller dropped
    NonRetryable,
}

/// Result of retry decision making
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation after the specified delay
    Retry { delay: Duration, attempt_number: u32 },
    /// Stop retrying and surface the error
    Stop { reason: String },
}

/// Retry policy: `max_retries` extra attempts, retry `n` waiting `delay_base * n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryManager {
    max_retries: u32,
    delay_base: Duration,
}

impl RetryManager {
    pub fn new(max_retries: u32, delay_base: Duration) -> Self {
        Self {
            max_retries,
            delay_base,
        }
    }

    pub fn from_options(options: &CallOptions) -> Self {
        Self::new(
            options.retry_attempts,
            Duration::from_millis(options.retry_delay_base_ms),
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn classify_error(&self, error: &CallError) -> ErrorClassification {
        match error {
            CallError::Cancelled => ErrorClassification::NonRetryable,
            CallError::Timeout(_) | CallError::Network(_) | CallError::Failed(_) => {
                ErrorClassification::Retryable
            }
        }
    }

    /// Decide what to do after a failure, given how many retries were
    /// already spent.
    pub fn should_retry(&self, error: &CallError, retries_spent: u32) -> RetryDecision {
        if self.classify_error(error) == ErrorClassification::NonRetryable {
            return RetryDecision::Stop {
                reason: "Error is not retryable".to_string(),
            };
        }

        if retries_spent >= self.max_retries {
            return RetryDecision::Stop {
                reason: format!("Maximum retry attempts ({}) exceeded", self.max_retries),
            };
        }

        let attempt_number = retries_spent + 1;
        RetryDecision::Retry {
            delay: self.calculate_delay(attempt_number),
            attempt_number,
        }
    }

    /// Delay before retry `attempt_number` (1-based)
    pub fn calculate_delay(&self, attempt_number: u32) -> Duration {
        self.delay_base.saturating_mul(attempt_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let manager = RetryManager::new(3, Duration::from_millis(1000));
        assert_eq!(
            manager.classify_error(&CallError::deadline(10)),
            ErrorClassification::Retryable
        );
        assert_eq!(
            manager.classify_error(&CallError::network("down")),
            ErrorClassification::Retryable
        );
        assert_eq!(
            manager.classify_error(&CallError::Cancelled),
            ErrorClassification::NonRetryable
        );
    }

    #[test]
    fn test_retry_decision_max_attempts() {
        let manager = RetryManager::new(2, Duration::from_millis(100));
        let error = CallError::network("network error");

        assert_eq!(
            manager.should_retry(&error, 0),
            RetryDecision::Retry {
                delay: Duration::from_millis(100),
                attempt_number: 1
            }
        );
        assert_eq!(
            manager.should_retry(&error, 1),
            RetryDecision::Retry {
                delay: Duration::from_millis(200),
                attempt_number: 2
            }
        );
        match manager.should_retry(&error, 2) {
            RetryDecision::Stop { reason } => assert!(reason.contains("Maximum retry attempts")),
            RetryDecision::Retry { .. } => panic!("Should stop after max attempts"),
        }
    }

    #[test]
    fn test_cancelled_never_retried() {
        let manager = RetryManager::new(3, Duration::from_millis(1000));
        match manager.should_retry(&CallError::Cancelled, 0) {
            RetryDecision::Stop { reason } => assert!(reason.contains("not retryable")),
            RetryDecision::Retry { .. } => panic!("Cancelled attempts must not be retried"),
        }
    }

    #[test]
    fn test_delay_is_linear_and_strictly_increasing() {
        let manager = RetryManager::new(5, Duration::from_millis(250));
        let delays: Vec<_> = (1..=5).map(|n| manager.calculate_delay(n)).collect();
        assert_eq!(delays[0], Duration::from_millis(250));
        assert_eq!(delays[4], Duration::from_millis(1250));
        assert!(delays.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_zero_retries_never_retries() {
        let manager = RetryManager::from_options(&CallOptions::default());
        assert!(matches!(
            manager.should_retry(&CallError::failed("x"), 0),
            RetryDecision::Stop { .. }
        ));
    }

    #[test]
    fn test_from_options() {
        let options = CallOptions::default().with_retries(4, 50);
        let manager = RetryManager::from_options(&options);
        assert_eq!(manager.max_retries(), 4);
        assert_eq!(manager.calculate_delay(2), Duration::from_millis(100));
    }
}
