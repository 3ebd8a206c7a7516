//! Scripted units of work loaded from scenario files

use anyhow::{bail, Context};
use async_trait::async_trait;
use callstate_config::FileFormat;
use callstate_core::{CallError, CallResult, Page, PageRequest};
use callstate_runtime::{CancellationToken, RemoteCall};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What one scripted attempt produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok(JsonValue),
    Fail(String),
}

/// One attempt: wait `delay_ms`, then settle with `outcome`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// A scripted call for the batch command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallScript {
    #[serde(default)]
    pub params: Option<JsonValue>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Params handed to the single call
    pub params: Option<JsonValue>,
    /// Steps of the single call
    pub steps: Vec<Step>,
    /// Batch slots, in order
    pub calls: Vec<CallScript>,
    /// Catalog served by the page fetcher
    pub items: Vec<JsonValue>,
    pub page_delay_ms: u64,
    /// Pages whose fetch always fails
    pub fail_pages: Vec<u32>,
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        if content.trim().is_empty() {
            bail!("scenario {} is empty", path.display());
        }
        let format = FileFormat::from_path(path)?;
        let raw = format
            .parse(&content)
            .with_context(|| format!("parsing scenario {}", path.display()))?;
        serde_json::from_value(raw)
            .with_context(|| format!("decoding scenario {}", path.display()))
    }
}

/// Replays a list of steps, one per attempt; the last step repeats.
#[derive(Debug)]
pub struct ScriptedCall {
    steps: Vec<Step>,
    attempts: Arc<AtomicUsize>,
}

impl ScriptedCall {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared attempt counter, readable after the call is moved into an executor
    pub fn attempts(&self) -> Arc<AtomicUsize> {
        self.attempts.clone()
    }
}

#[async_trait]
impl RemoteCall<JsonValue, JsonValue> for ScriptedCall {
    async fn call(
        &self,
        _params: Option<JsonValue>,
        cancel: CancellationToken,
    ) -> CallResult<JsonValue> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .get(attempt)
            .or_else(|| self.steps.last())
            .ok_or_else(|| CallError::failed("scripted call has no steps"))?;

        tokio::select! {
            _ = cancel.cancelled() => return Err(CallError::Cancelled),
            _ = tokio::time::sleep(Duration::from_millis(step.delay_ms)) => {}
        }

        match &step.outcome {
            Outcome::Ok(value) => Ok(value.clone()),
            Outcome::Fail(message) => Err(CallError::from_message(message.as_str())),
        }
    }
}

/// Serves slices of a fixed catalog as pages
#[derive(Debug)]
pub struct ScriptedPages {
    items: Vec<JsonValue>,
    delay: Duration,
    fail_pages: Vec<u32>,
    fetches: Arc<AtomicUsize>,
}

impl ScriptedPages {
    pub fn new(items: Vec<JsonValue>, delay_ms: u64, fail_pages: Vec<u32>) -> Self {
        Self {
            items,
            delay: Duration::from_millis(delay_ms),
            fail_pages,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_scenario(scenario: &Scenario) -> Self {
        Self::new(
            scenario.items.clone(),
            scenario.page_delay_ms,
            scenario.fail_pages.clone(),
        )
    }

    pub fn fetches(&self) -> Arc<AtomicUsize> {
        self.fetches.clone()
    }
}

#[async_trait]
impl RemoteCall<PageRequest<JsonValue>, Page<JsonValue>> for ScriptedPages {
    async fn call(
        &self,
        request: Option<PageRequest<JsonValue>>,
        cancel: CancellationToken,
    ) -> CallResult<Page<JsonValue>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let request = request.ok_or_else(|| CallError::failed("page request missing"))?;

        tokio::select! {
            _ = cancel.cancelled() => return Err(CallError::Cancelled),
            _ = tokio::time::sleep(self.delay) => {}
        }

        if self.fail_pages.contains(&request.page) {
            return Err(CallError::network(format!("page {} unavailable", request.page)));
        }

        let size = request.page_size.max(1) as usize;
        let start = (request.page.max(1) as usize - 1).saturating_mul(size);
        let end = start.saturating_add(size).min(self.items.len());
        let items = self.items.get(start..end).map(<[_]>::to_vec).unwrap_or_default();

        Ok(Page {
            items,
            total: self.items.len() as u64,
            has_more: end < self.items.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_parsing() {
        let steps: Vec<Step> = serde_yaml::from_str(
            "- { delay_ms: 20, fail: \"network error\" }\n- { ok: { id: 1 } }\n",
        )
        .unwrap();

        assert_eq!(steps[0].delay_ms, 20);
        assert_eq!(steps[0].outcome, Outcome::Fail("network error".to_string()));
        assert_eq!(steps[1].delay_ms, 0);
        assert_eq!(steps[1].outcome, Outcome::Ok(json!({"id": 1})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_call_repeats_last_step() {
        let call = ScriptedCall::new(vec![
            Step {
                delay_ms: 5,
                outcome: Outcome::Fail("connection refused".to_string()),
            },
            Step {
                delay_ms: 5,
                outcome: Outcome::Ok(json!(1)),
            },
        ]);
        let token = CancellationToken::new();

        assert!(matches!(
            call.call(None, token.clone()).await,
            Err(CallError::Network(_))
        ));
        assert_eq!(call.call(None, token.clone()).await, Ok(json!(1)));
        assert_eq!(call.call(None, token).await, Ok(json!(1)));
        assert_eq!(call.attempts().load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_script_fails() {
        let call = ScriptedCall::new(Vec::new());
        let result = call.call(None, CancellationToken::new()).await;
        assert_eq!(result, Err(CallError::failed("scripted call has no steps")));
    }

    #[tokio::test]
    async fn test_scripted_pages_slices_catalog() {
        let pages = ScriptedPages::new((1..=5).map(|n| json!(n)).collect(), 0, vec![2]);
        let request = |page| PageRequest {
            page,
            page_size: 2,
            extra: None,
        };

        let first = pages.call(Some(request(1)), CancellationToken::new()).await.unwrap();
        assert_eq!(first.items, vec![json!(1), json!(2)]);
        assert!(first.has_more);

        let failed = pages.call(Some(request(2)), CancellationToken::new()).await;
        assert!(matches!(failed, Err(CallError::Network(_))));

        let last = pages.call(Some(request(3)), CancellationToken::new()).await.unwrap();
        assert_eq!(last.items, vec![json!(5)]);
        assert!(!last.has_more);
        assert_eq!(last.total, 5);
    }
}
