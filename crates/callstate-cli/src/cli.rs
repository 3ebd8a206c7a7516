//! CLI argument definitions using clap

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "callstate",
    about = "Drive call executors against scripted units of work",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Engine manifest (YAML or JSON) with call-option profiles
    #[arg(long, env = "CALLSTATE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one scripted call through a single-call executor
    Run {
        #[command(flatten)]
        args: ScenarioArgs,
    },

    /// Run every scripted call in the scenario concurrently
    Batch {
        #[command(flatten)]
        args: ScenarioArgs,
    },

    /// Page through a scripted item list
    Paginate {
        #[command(flatten)]
        args: ScenarioArgs,

        /// Items per page; defaults to the manifest's pagination.page_size
        #[arg(long)]
        page_size: Option<u32>,

        /// Stop after loading this many pages
        #[arg(long)]
        pages: Option<u32>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ScenarioArgs {
    /// Scenario file (YAML or JSON)
    pub scenario: PathBuf,

    /// Call-option profile from the engine manifest
    #[arg(long)]
    pub profile: Option<String>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    /// Human-readable colored summary
    Text,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    Pretty,
}

impl OutputFormat {
    /// Render `report` as JSON, or return `None` for the text format
    pub fn render_json<T: Serialize>(&self, report: &T) -> Result<Option<String>, serde_json::Error> {
        match self {
            Self::Text => Ok(None),
            Self::Json => serde_json::to_string(report).map(Some),
            Self::Pretty => serde_json::to_string_pretty(report).map(Some),
        }
    }
}
