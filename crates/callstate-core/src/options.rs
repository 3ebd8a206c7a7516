use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EngineError, EngineResult};

/// Behaviour knobs for a call executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallOptions {
    pub show_error_toast: bool,
    pub show_success_toast: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
    /// Additional attempts after the first failure
    pub retry_attempts: u32,
    /// Retry `n` waits `retry_delay_base_ms * n`
    pub retry_delay_base_ms: u64,
    pub timeout_ms: u64,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            show_error_toast: true,
            show_success_toast: false,
            success_message: None,
            retry_attempts: 0,
            retry_delay_base_ms: 1_000,
            timeout_ms: 30_000,
        }
    }
}

impl CallOptions {
    pub fn with_retries(mut self, attempts: u32, delay_base_ms: u64) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay_base_ms = delay_base_ms;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_success_toast(mut self, message: impl Into<String>) -> Self {
        self.show_success_toast = true;
        self.success_message = Some(message.into());
        self
    }

    pub fn without_error_toast(mut self) -> Self {
        self.show_error_toast = false;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.timeout_ms == 0 {
            return Err(EngineError::invalid("timeout_ms must be greater than 0"));
        }
        Ok(())
    }
}

/// Defaults for paginated executors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationOptions {
    pub page_size: u32,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

impl PaginationOptions {
    pub fn validate(&self) -> EngineResult<()> {
        if self.page_size == 0 {
            return Err(EngineError::invalid("page_size must be greater than 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CallOptions::default();
        assert_eq!(options.retry_attempts, 0);
        assert_eq!(options.retry_delay_base_ms, 1000);
        assert_eq!(options.timeout_ms, 30000);
        assert!(options.show_error_toast);
        assert!(!options.show_success_toast);
    }

    #[test]
    fn test_partial_deserialization_keeps_defaults() {
        let options: CallOptions = serde_json::from_str(r#"{"retry_attempts": 2}"#).unwrap();
        assert_eq!(options.retry_attempts, 2);
        assert_eq!(options.timeout_ms, 30000);
    }

    #[test]
    fn test_validation() {
        assert!(CallOptions::default().validate().is_ok());
        assert!(CallOptions::default().with_timeout_ms(0).validate().is_err());
        assert!(PaginationOptions { page_size: 0 }.validate().is_err());
    }
}
