pub mod batch;
pub mod paginate;
pub mod run;

use crate::cli::OutputFormat;
use crate::error::CliResult;
use crate::utils::validate_file_exists;
use callstate_config::{ConfigLoader, EngineConfig};
use callstate_core::CallOptions;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

// Re-export command handlers
pub use batch::{BatchCommand, BatchReport};
pub use paginate::{PaginateCommand, PaginateReport};
pub use run::{RunCommand, RunReport};

/// What every command needs besides its own arguments
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: EngineConfig,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Load the engine manifest if one was given, else use defaults
    pub fn load(config_path: Option<&Path>, format: OutputFormat) -> CliResult<Self> {
        let config = match config_path {
            Some(path) => {
                validate_file_exists(path)?;
                ConfigLoader::new().load_from_file(path)?
            }
            None => {
                debug!("no engine config given, using defaults");
                EngineConfig::default()
            }
        };
        Ok(Self { config, format })
    }

    pub fn options(&self, profile: Option<&str>) -> CliResult<CallOptions> {
        let options = self.config.profile_or_default(profile)?;
        options.validate()?;
        Ok(options)
    }

    /// Print `report` in the selected format; `text` renders the text form
    pub fn emit<R: Serialize>(&self, report: &R, text: impl FnOnce() -> String) -> CliResult<()> {
        match self.format.render_json(report)? {
            Some(json) => println!("{}", json),
            None => println!("{}", text()),
        }
        Ok(())
    }
}
