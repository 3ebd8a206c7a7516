//! Single-call scenario command

use super::CommandContext;
use crate::{
    cli::ScenarioArgs,
    error::{CliError, CliResult},
    scenario::{Scenario, ScriptedCall},
    utils::{format_duration, truncate_text, ColoredOutput, ConsoleNotifier},
};
use callstate_core::{CallOptions, CallState};
use callstate_runtime::CallExecutor;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::{atomic::Ordering, Arc};
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub state: CallState<JsonValue>,
    pub attempts: usize,
    pub retry_count: u32,
    pub elapsed_ms: u64,
}

pub struct RunCommand;

impl RunCommand {
    pub async fn run(ctx: &CommandContext, args: &ScenarioArgs) -> CliResult<()> {
        let options = ctx.options(args.profile.as_deref())?;
        let scenario = Scenario::load(&args.scenario)?;
        info!(scenario = %args.scenario.display(), "running single call");

        let report = Self::execute(&scenario, options).await?;
        ctx.emit(&report, || Self::render_text(&report))?;

        match &report.state.error {
            Some(failure) => Err(CliError::ExecutionFailed(failure.message.clone())),
            None => Ok(()),
        }
    }

    pub async fn execute(scenario: &Scenario, options: CallOptions) -> CliResult<RunReport> {
        if scenario.steps.is_empty() {
            return Err(CliError::InvalidScenario(
                "'steps' must list at least one step".to_string(),
            ));
        }

        let call = ScriptedCall::new(scenario.steps.clone());
        let attempts = call.attempts();
        let executor = CallExecutor::<JsonValue, JsonValue>::try_new(call, options)?
            .with_notifier(Arc::new(ConsoleNotifier));

        let started = Instant::now();
        executor.execute(scenario.params.clone()).await;

        Ok(RunReport {
            state: executor.state(),
            attempts: attempts.load(Ordering::SeqCst),
            retry_count: executor.retry_count(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn render_text(report: &RunReport) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "Status: {}\n",
            ColoredOutput::status(report.state.status)
        ));
        if let Some(data) = &report.state.data {
            output.push_str(&format!("Data: {}\n", truncate_text(&data.to_string(), 120)));
        }
        if let Some(failure) = &report.state.error {
            output.push_str(&format!(
                "Error: {} {}\n",
                ColoredOutput::error(&failure.message),
                ColoredOutput::dim(&format!("({})", failure.detail))
            ));
        }
        output.push_str(&format!(
            "Attempts: {}  Duration: {}",
            ColoredOutput::highlight(&report.attempts.to_string()),
            ColoredOutput::info(&format_duration(Duration::from_millis(report.elapsed_ms)))
        ));
        output
    }
}
