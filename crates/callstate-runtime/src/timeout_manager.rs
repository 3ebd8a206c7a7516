//! Per-attempt timeout and cancellation racing

use crate::call::RemoteCall;
use callstate_core::{CallError, CallOptions, CallResult, EngineError, EngineResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Applies the attempt timeout to a unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutManager {
    timeout: Duration,
}

impl TimeoutManager {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn from_options(options: &CallOptions) -> Self {
        Self::new(options.timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute a future, turning an elapsed deadline into [`CallError::Timeout`]
    pub async fn execute_with_timeout<F, T>(&self, operation: F) -> CallResult<T>
    where
        F: Future<Output = CallResult<T>>,
    {
        match timeout(self.timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(CallError::deadline(self.timeout.as_millis() as u64)),
        }
    }

    /// Run one attempt of `call`, racing it against the deadline and `cancel`.
    ///
    /// The work receives a child of `cancel`; the child is cancelled once the
    /// attempt settles so work that outlived its deadline is told to stop.
    pub async fn run_attempt<P, T>(
        &self,
        call: &dyn RemoteCall<P, T>,
        params: Option<P>,
        cancel: &CancellationToken,
    ) -> CallResult<T> {
        let attempt_token = cancel.child_token();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CallError::Cancelled),
            result = self.execute_with_timeout(call.call(params, attempt_token.clone())) => result,
        };
        attempt_token.cancel();
        outcome
    }

    /// Reject a zero deadline; warn about one longer than ten minutes
    pub fn validate(&self) -> EngineResult<()> {
        if self.timeout.is_zero() {
            return Err(EngineError::invalid("timeout must be greater than 0"));
        }

        const MAX_REASONABLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);
        if self.timeout > MAX_REASONABLE_TIMEOUT {
            tracing::warn!(
                timeout_ms = self.timeout.as_millis() as u64,
                "attempt timeout is very long"
            );
        }

        Ok(())
    }
}
