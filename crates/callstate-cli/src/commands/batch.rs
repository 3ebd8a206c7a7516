//! Batch scenario command

use super::CommandContext;
use crate::{
    cli::ScenarioArgs,
    error::{CliError, CliResult},
    scenario::{Scenario, ScriptedCall},
    utils::{format_duration, truncate_text, ColoredOutput},
};
use callstate_core::{CallOptions, CallState};
use callstate_runtime::BatchExecutor;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub slots: Vec<CallState<JsonValue>>,
    pub has_any_error: bool,
    pub elapsed_ms: u64,
}

impl BatchReport {
    pub fn failed_slots(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.has_error())
            .map(|(index, _)| index)
            .collect()
    }
}

pub struct BatchCommand;

impl BatchCommand {
    pub async fn run(ctx: &CommandContext, args: &ScenarioArgs) -> CliResult<()> {
        let options = ctx.options(args.profile.as_deref())?;
        let scenario = Scenario::load(&args.scenario)?;
        info!(scenario = %args.scenario.display(), slots = scenario.calls.len(), "running batch");

        let report = Self::execute(&scenario, &options).await?;
        ctx.emit(&report, || Self::render_text(&report))?;

        let failed = report.failed_slots();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(CliError::ExecutionFailed(format!(
                "{} of {} slots failed: {:?}",
                failed.len(),
                report.slots.len(),
                failed
            )))
        }
    }

    pub async fn execute(scenario: &Scenario, options: &CallOptions) -> CliResult<BatchReport> {
        if scenario.calls.is_empty() {
            return Err(CliError::InvalidScenario(
                "'calls' must list at least one call".to_string(),
            ));
        }

        let batch = scenario
            .calls
            .iter()
            .fold(BatchExecutor::<JsonValue, JsonValue>::try_new(options)?, |batch, script| {
                batch.with_call(ScriptedCall::new(script.steps.clone()))
            });
        let params = scenario.calls.iter().map(|script| script.params.clone()).collect();

        let started = Instant::now();
        batch.execute_all(params).await;

        Ok(BatchReport {
            slots: batch.state(),
            has_any_error: batch.has_any_error(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn render_text(report: &BatchReport) -> String {
        let mut output = String::new();
        for (index, slot) in report.slots.iter().enumerate() {
            let detail = match (&slot.data, &slot.error) {
                (_, Some(failure)) => ColoredOutput::error(&failure.message).to_string(),
                (Some(data), None) => truncate_text(&data.to_string(), 80),
                (None, None) => String::new(),
            };
            output.push_str(&format!(
                "[{}] {} {}\n",
                index,
                ColoredOutput::status(slot.status),
                detail
            ));
        }
        output.push_str(&format!(
            "Duration: {}",
            ColoredOutput::info(&format_duration(Duration::from_millis(report.elapsed_ms)))
        ));
        output
    }
}
