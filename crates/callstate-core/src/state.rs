use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CallFailure;

/// Lifecycle of one logical operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// Observable state of one logical operation.
///
/// Every transition is one of three shapes: a loading-start clears `error`
/// and keeps `data`, a success sets `data` and clears `error`, a failure sets
/// `error` and keeps whatever `data` an earlier success left behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallState<T> {
    pub data: Option<T>,
    pub status: CallStatus,
    pub error: Option<CallFailure>,
    pub last_completed_at: Option<DateTime<Utc>>,
}

impl<T> Default for CallState<T> {
    fn default() -> Self {
        Self {
            data: None,
            status: CallStatus::Idle,
            error: None,
            last_completed_at: None,
        }
    }
}

impl<T> CallState<T> {
    pub fn is_loading(&self) -> bool {
        self.status == CallStatus::Loading
    }

    pub fn is_idle(&self) -> bool {
        self.status == CallStatus::Idle
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn begin_loading(&mut self) {
        self.status = CallStatus::Loading;
        self.error = None;
    }

    pub fn record_success(&mut self, data: T) {
        self.data = Some(data);
        self.error = None;
        self.status = CallStatus::Succeeded;
        self.last_completed_at = Some(Utc::now());
    }

    pub fn record_failure(&mut self, failure: CallFailure) {
        self.error = Some(failure);
        self.status = CallStatus::Failed;
    }

    /// Leave the loading state without recording an outcome.
    pub fn abandon(&mut self) {
        if self.is_loading() {
            self.status = CallStatus::Idle;
        }
    }
}
