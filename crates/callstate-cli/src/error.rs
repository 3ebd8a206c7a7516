//! Error types for the CLI

use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] callstate_config::ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] callstate_core::EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("General error: {0}")]
    General(String),
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        Self::General(format!("{:#}", err))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
