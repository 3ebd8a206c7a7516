//! Batch executor: N independent calls run concurrently, one state slot each.

use crate::call::RemoteCall;
use crate::retry_manager::{RetryDecision, RetryManager};
use crate::timeout_manager::TimeoutManager;
use callstate_core::{
    CallError, CallFailure, CallOptions, CallResult, CallState, EngineError, EngineResult,
};
use futures::future::join_all;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Default)]
struct SlotControl {
    generation: u64,
    token: Option<CancellationToken>,
}

/// Runs a fixed, ordered set of calls. Each slot has its own lifecycle; a
/// failing slot never blocks or cancels its siblings.
pub struct BatchExecutor<P, T> {
    calls: Vec<Box<dyn RemoteCall<P, T>>>,
    retry_manager: RetryManager,
    timeout_manager: TimeoutManager,
    slots: Mutex<Vec<SlotControl>>,
    state: watch::Sender<Vec<CallState<T>>>,
}

impl<P, T> BatchExecutor<P, T>
where
    P: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new(options: &CallOptions) -> Self {
        let (state, _) = watch::channel(Vec::new());
        Self {
            calls: Vec::new(),
            retry_manager: RetryManager::from_options(options),
            timeout_manager: TimeoutManager::from_options(options),
            slots: Mutex::new(Vec::new()),
            state,
        }
    }

    /// Like [`new`](Self::new), but rejects a zero timeout
    pub fn try_new(options: &CallOptions) -> EngineResult<Self> {
        TimeoutManager::from_options(options).validate()?;
        Ok(Self::new(options))
    }

    /// Append a slot
    pub fn with_call(mut self, call: impl RemoteCall<P, T> + 'static) -> Self {
        self.calls.push(Box::new(call));
        self.slots_mut().push(SlotControl::default());
        self.state.send_modify(|slots| slots.push(CallState::default()));
        self
    }

    /// Append a slot backed by a closure
    pub fn with_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Option<P>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallResult<T>> + Send + 'static,
    {
        self.with_call(f)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn state(&self) -> Vec<CallState<T>> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<CallState<T>>> {
        self.state.subscribe()
    }

    pub fn is_any_loading(&self) -> bool {
        self.state.borrow().iter().any(CallState::is_loading)
    }

    pub fn has_any_error(&self) -> bool {
        self.state.borrow().iter().any(CallState::has_error)
    }

    /// Each slot's data, `None` for slots that never succeeded
    pub fn all_data(&self) -> Vec<Option<T>> {
        self.state
            .borrow()
            .iter()
            .map(|slot| slot.data.clone())
            .collect()
    }

    /// Run every slot concurrently and wait for all of them to settle.
    ///
    /// `params_per_item[i]` feeds slot `i`; missing entries mean no params.
    pub async fn execute_all(&self, params_per_item: Vec<Option<P>>) -> Vec<Option<T>> {
        let started = {
            let mut slots = self.slots();
            let started: Vec<(u64, CancellationToken)> =
                slots.iter_mut().map(Self::start_slot).collect();
            self.state
                .send_modify(|states| states.iter_mut().for_each(CallState::begin_loading));
            started
        };
        debug!(slots = started.len(), "executing batch");

        let runs = started
            .into_iter()
            .enumerate()
            .map(|(index, (generation, token))| {
                let params = params_per_item.get(index).cloned().flatten();
                self.run_slot(index, generation, token, params)
            });
        join_all(runs).await
    }

    /// Run a single slot, leaving its siblings untouched
    pub async fn execute_one(&self, index: usize, params: Option<P>) -> EngineResult<Option<T>> {
        let (generation, token) = {
            let mut slots = self.slots();
            let len = slots.len();
            let slot = slots
                .get_mut(index)
                .ok_or(EngineError::SlotOutOfRange { index, len })?;
            let started = Self::start_slot(slot);
            self.state
                .send_modify(|states| states[index].begin_loading());
            started
        };
        Ok(self.run_slot(index, generation, token, params).await)
    }

    /// Cancel every slot and clear all of them to idle
    pub fn reset_all(&self) {
        let mut slots = self.slots();
        for slot in slots.iter_mut() {
            if let Some(token) = slot.token.take() {
                token.cancel();
            }
            slot.generation += 1;
        }
        let len = slots.len();
        self.state
            .send_replace((0..len).map(|_| CallState::default()).collect());
    }

    fn slots(&self) -> MutexGuard<'_, Vec<SlotControl>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slots_mut(&mut self) -> &mut Vec<SlotControl> {
        self.slots.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_slot(slot: &mut SlotControl) -> (u64, CancellationToken) {
        if let Some(previous) = slot.token.take() {
            previous.cancel();
        }
        slot.generation += 1;
        let token = CancellationToken::new();
        slot.token = Some(token.clone());
        (slot.generation, token)
    }

    async fn run_slot(
        &self,
        index: usize,
        generation: u64,
        token: CancellationToken,
        params: Option<P>,
    ) -> Option<T> {
        let call = self.calls[index].as_ref();
        let mut retries_spent = 0;

        loop {
            let err = match self
                .timeout_manager
                .run_attempt(call, params.clone(), &token)
                .await
            {
                Ok(value) => {
                    let applied =
                        self.apply(index, generation, |state| state.record_success(value.clone()));
                    return applied.then_some(value);
                }
                Err(CallError::Cancelled) => {
                    self.apply(index, generation, CallState::abandon);
                    return None;
                }
                Err(err) => err,
            };

            match self.retry_manager.should_retry(&err, retries_spent) {
                RetryDecision::Retry {
                    delay,
                    attempt_number,
                } => {
                    retries_spent = attempt_number;
                    warn!(
                        slot = index,
                        attempt = attempt_number,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying batch slot"
                    );
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return None,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                RetryDecision::Stop { reason } => {
                    let failure = CallFailure::from(&err);
                    if self.apply(index, generation, |state| state.record_failure(failure)) {
                        warn!(slot = index, error = %err, reason = %reason, "batch slot failed");
                    }
                    return None;
                }
            }
        }
    }

    /// Apply a transition to slot `index` if `generation` still owns it
    fn apply(&self, index: usize, generation: u64, f: impl FnOnce(&mut CallState<T>)) -> bool {
        let mut slots = self.slots();
        let slot = &mut slots[index];
        if slot.generation != generation {
            debug!(slot = index, generation, "discarding superseded slot result");
            return false;
        }
        slot.token = None;
        self.state.send_modify(|states| f(&mut states[index]));
        true
    }
}

impl<P, T> Drop for BatchExecutor<P, T> {
    fn drop(&mut self) {
        let slots = self.slots.get_mut().unwrap_or_else(PoisonError::into_inner);
        for slot in slots.iter_mut() {
            if let Some(token) = slot.token.take() {
                token.cancel();
            }
        }
    }
}

impl<P, T> std::fmt::Debug for BatchExecutor<P, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("slots", &self.calls.len())
            .finish_non_exhaustive()
    }
}
