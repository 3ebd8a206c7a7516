use crate::env_resolver::EnvResolver;
use crate::error::{ConfigError, ConfigResult};
use crate::schema::EngineConfig;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Supported file formats for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    /// Detect file format from extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Ok(FileFormat::Yaml),
            Some("json") => Ok(FileFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::UnsupportedFormat("no extension".to_string())),
        }
    }

    /// Parse `content` into a generic JSON tree
    pub fn parse(self, content: &str) -> ConfigResult<JsonValue> {
        Ok(match self {
            FileFormat::Yaml => serde_yaml::from_str(content)?,
            FileFormat::Json => serde_json::from_str(content)?,
        })
    }
}

/// Loads an [`EngineConfig`] manifest, substituting environment references
/// before deserializing.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    resolver: EnvResolver,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(resolver: EnvResolver) -> Self {
        Self { resolver }
    }

    /// Load configuration from a file
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<EngineConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let format = FileFormat::from_path(path)?;
        debug!(path = %path.display(), ?format, "loading engine config");

        self.parse_content(&content, format)
    }

    /// Parse configuration content directly
    pub fn parse_content(&self, content: &str, format: FileFormat) -> ConfigResult<EngineConfig> {
        // An empty document means "all defaults"
        let raw = if content.trim().is_empty() {
            JsonValue::Object(serde_json::Map::new())
        } else {
            format.parse(content)?
        };
        if !raw.is_object() {
            return Err(ConfigError::Validation(
                "Engine config must be a mapping at the top level".to_string(),
            ));
        }

        let resolved = self.resolver.resolve(&raw)?;
        let config: EngineConfig = serde_json::from_value(resolved)?;
        config.validate()?;
        debug!(profiles = config.profiles.len(), "engine config loaded");
        Ok(config)
    }
}
