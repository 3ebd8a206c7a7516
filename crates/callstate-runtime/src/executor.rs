//! Single-call executor: one logical operation with state, cancellation,
//! timeout and bounded retry.

use crate::call::RemoteCall;
use crate::retry_manager::{RetryDecision, RetryManager};
use crate::timeout_manager::TimeoutManager;
use callstate_core::{
    CallError, CallFailure, CallOptions, CallResult, CallState, EngineResult, NoopNotifier,
    NotificationKind, Notifier,
};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const DEFAULT_SUCCESS_MESSAGE: &str = "Operation completed successfully";

type SuccessHook<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&CallFailure) + Send + Sync>;

/// Bookkeeping for the attempt currently owning this executor
struct AttemptControl<P> {
    /// Bumped whenever an attempt starts or is abandoned; results tagged with
    /// an older generation are discarded.
    generation: u64,
    token: Option<CancellationToken>,
    retry_count: u32,
    last_params: Option<P>,
}

/// Drives one logical asynchronous operation.
///
/// At most one attempt is live at a time: [`execute`](Self::execute)
/// supersedes whatever is in flight, and a superseded attempt never touches
/// state, never fires callbacks and never spends retry budget.
pub struct CallExecutor<P, T> {
    call: Box<dyn RemoteCall<P, T>>,
    options: CallOptions,
    retry_manager: RetryManager,
    timeout_manager: TimeoutManager,
    notifier: Arc<dyn Notifier>,
    on_success: Option<SuccessHook<T>>,
    on_error: Option<ErrorHook>,
    control: Mutex<AttemptControl<P>>,
    state: watch::Sender<CallState<T>>,
}

impl<P, T> CallExecutor<P, T>
where
    P: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new(call: impl RemoteCall<P, T> + 'static, options: CallOptions) -> Self {
        let (state, _) = watch::channel(CallState::default());
        Self {
            call: Box::new(call),
            retry_manager: RetryManager::from_options(&options),
            timeout_manager: TimeoutManager::from_options(&options),
            options,
            notifier: Arc::new(NoopNotifier),
            on_success: None,
            on_error: None,
            control: Mutex::new(AttemptControl {
                generation: 0,
                token: None,
                retry_count: 0,
                last_params: None,
            }),
            state,
        }
    }

    /// Like [`new`](Self::new), but rejects options no attempt could succeed
    /// under, such as a zero timeout.
    pub fn try_new(
        call: impl RemoteCall<P, T> + 'static,
        options: CallOptions,
    ) -> EngineResult<Self> {
        TimeoutManager::from_options(&options).validate()?;
        Ok(Self::new(call, options))
    }

    /// Build an executor from a closure
    pub fn from_fn<F, Fut>(f: F, options: CallOptions) -> Self
    where
        F: Fn(Option<P>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallResult<T>> + Send + 'static,
    {
        Self::new(f, options)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn on_success(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl Fn(&CallFailure) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub fn options(&self) -> &CallOptions {
        &self.options
    }

    /// Snapshot of the current state
    pub fn state(&self) -> CallState<T> {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state transition
    pub fn subscribe(&self) -> watch::Receiver<CallState<T>> {
        self.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// Consecutive failed attempts since the last success or reset
    pub fn retry_count(&self) -> u32 {
        self.control().retry_count
    }

    /// Run the operation, superseding any attempt already in flight.
    ///
    /// Returns `None` when the operation fails after exhausting retries or
    /// when this call is itself superseded, cancelled or reset.
    pub async fn execute(&self, params: Option<P>) -> Option<T> {
        let (generation, token) = self.begin(params.clone());

        loop {
            debug!(generation, "starting attempt");
            let outcome = self
                .timeout_manager
                .run_attempt(self.call.as_ref(), params.clone(), &token)
                .await;

            let err = match outcome {
                Ok(value) => return self.settle_success(generation, value),
                Err(CallError::Cancelled) => {
                    self.settle_cancelled(generation);
                    return None;
                }
                Err(err) => err,
            };

            let decision = {
                let mut control = self.control();
                if control.generation != generation {
                    debug!(generation, "discarding failure of superseded attempt");
                    return None;
                }
                let decision = self.retry_manager.should_retry(&err, control.retry_count);
                if matches!(decision, RetryDecision::Retry { .. }) {
                    control.retry_count += 1;
                }
                decision
            };

            match decision {
                RetryDecision::Retry {
                    delay,
                    attempt_number,
                } => {
                    warn!(
                        generation,
                        attempt = attempt_number,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying call"
                    );
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return None,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                RetryDecision::Stop { reason } => {
                    return self.settle_failure(generation, &err, &reason);
                }
            }
        }
    }

    /// Re-run with the most recently supplied params
    pub async fn retry(&self) -> Option<T> {
        let params = self.control().last_params.clone();
        self.execute(params).await
    }

    /// Abort the in-flight attempt, keeping recorded data and error
    pub fn cancel(&self) {
        let mut control = self.control();
        if let Some(token) = control.token.take() {
            debug!(generation = control.generation, "cancelling in-flight attempt");
            token.cancel();
            control.generation += 1;
            self.state.send_modify(CallState::abandon);
        }
    }

    /// Cancel anything in flight and return to a pristine idle state
    pub fn reset(&self) {
        let mut control = self.control();
        if let Some(token) = control.token.take() {
            token.cancel();
        }
        control.generation += 1;
        control.retry_count = 0;
        self.state.send_replace(CallState::default());
    }

    fn control(&self) -> MutexGuard<'_, AttemptControl<P>> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, params: Option<P>) -> (u64, CancellationToken) {
        let mut control = self.control();
        if let Some(previous) = control.token.take() {
            debug!(generation = control.generation, "superseding in-flight attempt");
            previous.cancel();
        }
        control.generation += 1;
        control.last_params = params;
        let token = CancellationToken::new();
        control.token = Some(token.clone());
        self.state.send_modify(CallState::begin_loading);
        (control.generation, token)
    }

    fn settle_success(&self, generation: u64, value: T) -> Option<T> {
        {
            let mut control = self.control();
            if control.generation != generation {
                debug!(generation, "discarding result of superseded attempt");
                return None;
            }
            control.token = None;
            control.retry_count = 0;
            self.state
                .send_modify(|state| state.record_success(value.clone()));
        }
        debug!(generation, "call succeeded");

        if let Some(hook) = &self.on_success {
            hook(&value);
        }
        if self.options.show_success_toast {
            let message = self
                .options
                .success_message
                .as_deref()
                .unwrap_or(DEFAULT_SUCCESS_MESSAGE);
            self.notifier
                .notify("Success", message, NotificationKind::Success);
        }
        Some(value)
    }

    fn settle_failure(&self, generation: u64, err: &CallError, reason: &str) -> Option<T> {
        let failure = CallFailure::from(err);
        {
            let mut control = self.control();
            if control.generation != generation {
                return None;
            }
            control.token = None;
            self.state
                .send_modify(|state| state.record_failure(failure.clone()));
        }
        warn!(
            generation,
            kind = ?failure.kind,
            error = %err,
            reason,
            "call failed"
        );

        if let Some(hook) = &self.on_error {
            hook(&failure);
        }
        if self.options.show_error_toast {
            self.notifier
                .notify("Error", &failure.message, NotificationKind::Error);
        }
        None
    }

    /// The work reported cancellation on its own; leave loading without an outcome.
    fn settle_cancelled(&self, generation: u64) {
        let mut control = self.control();
        if control.generation == generation {
            control.token = None;
            self.state.send_modify(CallState::abandon);
        }
    }
}

impl<P, T> Drop for CallExecutor<P, T> {
    fn drop(&mut self) {
        let control = self
            .control
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = control.token.take() {
            token.cancel();
        }
    }
}

impl<P, T> std::fmt::Debug for CallExecutor<P, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallExecutor")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
