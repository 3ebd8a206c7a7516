use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type CallResult<T> = Result<T, CallError>;
pub type EngineResult<T> = Result<T, EngineError>;

pub const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";
pub const NETWORK_MESSAGE: &str = "Network error. Please check your internet connection.";
pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred";

/// Failure reported by a unit of work or produced while driving it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// Carries the raw text: the elapsed deadline, or the transport's own message
    #[error("timeout: {0}")]
    Timeout(String),

    #[error("network: {0}")]
    Network(String),

    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Failed(String),
}

/// Observable classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    Network,
    Other,
}

impl CallError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// An attempt that produced nothing before its deadline
    pub fn deadline(after_ms: u64) -> Self {
        Self::Timeout(format!("no result within {}ms", after_ms))
    }

    /// Classify a raw message from a transport that only reports strings.
    ///
    /// Messages mentioning a timeout become [`CallError::Timeout`], messages mentioning connectivity become
    /// [`CallError::Network`], everything else is [`CallError::Failed`].
    pub fn from_message(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        let lower = msg.to_lowercase();

        if lower.contains("timeout") || lower.contains("timed out") {
            return Self::Timeout(msg);
        }

        const NETWORK_HINTS: [&str; 6] = [
            "network",
            "fetch",
            "connection",
            "econnrefused",
            "dns",
            "unreachable",
        ];
        if NETWORK_HINTS.iter().any(|hint| lower.contains(hint)) {
            return Self::Network(msg);
        }

        Self::Failed(msg)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Network(_) => ErrorKind::Network,
            Self::Cancelled | Self::Failed(_) => ErrorKind::Other,
        }
    }

    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout(_) => TIMEOUT_MESSAGE.to_string(),
            Self::Network(_) => NETWORK_MESSAGE.to_string(),
            Self::Cancelled => "Request was cancelled".to_string(),
            Self::Failed(msg) if msg.trim().is_empty() => FALLBACK_MESSAGE.to_string(),
            Self::Failed(msg) => msg.clone(),
        }
    }
}

/// A failure as recorded in observable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFailure {
    pub kind: ErrorKind,
    /// Normalized, user-facing message
    pub message: String,
    /// Raw text of the underlying error
    pub detail: String,
}

impl From<&CallError> for CallFailure {
    fn from(err: &CallError) -> Self {
        Self {
            kind: err.kind(),
            message: err.user_message(),
            detail: err.to_string(),
        }
    }
}

impl std::fmt::Display for CallFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Misuse of an executor or its configuration.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("slot {index} out of range (batch has {len} slots)")]
    SlotOutOfRange { index: usize, len: usize },

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("config: {0}")]
    Config(String),
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOptions(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_classification() {
        assert_eq!(
            CallError::from_message("Request timeout"),
            CallError::timeout("Request timeout")
        );
        assert_eq!(
            CallError::from_message("operation timed out"),
            CallError::timeout("operation timed out")
        );
        assert_eq!(
            CallError::from_message("network error"),
            CallError::Network("network error".to_string())
        );
        assert_eq!(
            CallError::from_message("Failed to fetch"),
            CallError::Network("Failed to fetch".to_string())
        );
        assert_eq!(
            CallError::from_message("invalid quiz id"),
            CallError::Failed("invalid quiz id".to_string())
        );
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(CallError::deadline(10).user_message(), TIMEOUT_MESSAGE);
        assert_eq!(CallError::network("reset").user_message(), NETWORK_MESSAGE);
        assert_eq!(CallError::failed("  ").user_message(), FALLBACK_MESSAGE);
        assert_eq!(CallError::failed("bad input").user_message(), "bad input");
    }

    #[test]
    fn test_failure_from_error() {
        let failure = CallFailure::from(&CallError::network("connection refused"));
        assert_eq!(failure.kind, ErrorKind::Network);
        assert_eq!(failure.message, NETWORK_MESSAGE);
        assert_eq!(failure.detail, "network: connection refused");
        assert_eq!(failure.to_string(), NETWORK_MESSAGE);
    }

    #[test]
    fn test_timeout_failure_keeps_raw_text() {
        let failure = CallFailure::from(&CallError::from_message("upstream timeout after 3 tries"));
        assert_eq!(failure.kind, ErrorKind::Timeout);
        assert_eq!(failure.message, TIMEOUT_MESSAGE);
        assert_eq!(failure.detail, "timeout: upstream timeout after 3 tries");

        let deadline = CallFailure::from(&CallError::deadline(250));
        assert_eq!(deadline.detail, "timeout: no result within 250ms");
    }
}
