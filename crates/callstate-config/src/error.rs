use crate::env_resolver::EnvResolverError;
use callstate_core::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Environment resolution error: {0}")]
    Env(#[from] EnvResolverError),

    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation(msg) => EngineError::InvalidOptions(msg),
            other => EngineError::Config(other.to_string()),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
