//! Paginated scenario command

use super::CommandContext;
use crate::{
    cli::ScenarioArgs,
    error::{CliError, CliResult},
    scenario::{Scenario, ScriptedPages},
    utils::{format_duration, ColoredOutput, ConsoleNotifier},
};
use callstate_core::{CallOptions, CallState, Page, PaginationState};
use callstate_runtime::PaginatedExecutor;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::{atomic::Ordering, Arc};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
pub struct PaginateReport {
    pub pagination: PaginationState<JsonValue>,
    pub state: CallState<Page<JsonValue>>,
    pub fetches: usize,
    pub elapsed_ms: u64,
}

pub struct PaginateCommand;

impl PaginateCommand {
    pub async fn run(
        ctx: &CommandContext,
        args: &ScenarioArgs,
        page_size: Option<u32>,
        max_pages: Option<u32>,
    ) -> CliResult<()> {
        let options = ctx.options(args.profile.as_deref())?;
        let page_size = page_size.unwrap_or(ctx.config.pagination.page_size);
        let scenario = Scenario::load(&args.scenario)?;
        info!(scenario = %args.scenario.display(), page_size, "paginating");

        let report = Self::execute(&scenario, options, page_size, max_pages).await?;
        ctx.emit(&report, || Self::render_text(&report))?;

        match &report.state.error {
            Some(failure) => Err(CliError::ExecutionFailed(failure.message.clone())),
            None => Ok(()),
        }
    }

    /// Load page 1, then keep loading more until the catalog is exhausted,
    /// a page fails or `max_pages` pages were loaded.
    pub async fn execute(
        scenario: &Scenario,
        options: CallOptions,
        page_size: u32,
        max_pages: Option<u32>,
    ) -> CliResult<PaginateReport> {
        let max_pages = max_pages.unwrap_or(u32::MAX).max(1);

        let fetcher = ScriptedPages::from_scenario(scenario);
        let fetches = fetcher.fetches();
        let pages = PaginatedExecutor::<JsonValue, JsonValue>::try_new(fetcher, page_size, options)?
            .with_notifier(Arc::new(ConsoleNotifier));

        let started = Instant::now();
        let mut loaded = pages.load_page(1, None).await.map_or(0, |_| 1);
        while loaded > 0 && loaded < max_pages && pages.has_more() {
            if pages.load_more(None).await.is_none() {
                break;
            }
            loaded += 1;
        }
        debug!(loaded, "pagination finished");

        Ok(PaginateReport {
            pagination: pages.pagination(),
            state: pages.state(),
            fetches: fetches.load(Ordering::SeqCst),
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn render_text(report: &PaginateReport) -> String {
        let pagination = &report.pagination;
        let mut output = String::new();
        output.push_str(&format!(
            "Status: {}\n",
            ColoredOutput::status(report.state.status)
        ));
        output.push_str(&format!(
            "Items: {} of {}  Page: {}  More: {}\n",
            ColoredOutput::highlight(&pagination.items.len().to_string()),
            pagination.total,
            pagination.page,
            pagination.has_more
        ));
        for item in &pagination.items {
            output.push_str(&format!("  {}\n", item));
        }
        if let Some(failure) = &report.state.error {
            output.push_str(&format!("Error: {}\n", ColoredOutput::error(&failure.message)));
        }
        output.push_str(&format!(
            "Fetches: {}  Duration: {}",
            report.fetches,
            ColoredOutput::info(&format_duration(Duration::from_millis(report.elapsed_ms)))
        ));
        output
    }
}
