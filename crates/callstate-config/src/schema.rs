use crate::error::{ConfigError, ConfigResult};
use callstate_core::{CallOptions, PaginationOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const MANIFEST_VERSION: &str = "v1";
pub const DEFAULT_PROFILE: &str = "default";

/// Top-level engine manifest: named call-option profiles plus pagination defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub version: String,
    /// Profile used when a caller does not name one
    pub default_profile: String,
    pub profiles: HashMap<String, CallOptions>,
    pub pagination: PaginationOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            default_profile: DEFAULT_PROFILE.to_string(),
            profiles: HashMap::new(),
            pagination: PaginationOptions::default(),
        }
    }
}

impl EngineConfig {
    /// Options for `name`. The default profile falls back to
    /// `CallOptions::default()` when the manifest does not declare it.
    pub fn profile(&self, name: &str) -> ConfigResult<CallOptions> {
        match self.profiles.get(name) {
            Some(options) => Ok(options.clone()),
            None if name == self.default_profile => Ok(CallOptions::default()),
            None => Err(ConfigError::UnknownProfile(name.to_string())),
        }
    }

    /// Options for `name`, or for the default profile when `name` is `None`
    pub fn profile_or_default(&self, name: Option<&str>) -> ConfigResult<CallOptions> {
        self.profile(name.unwrap_or(&self.default_profile))
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.version != MANIFEST_VERSION {
            return Err(ConfigError::Validation(format!(
                "Unsupported manifest version '{}', expected '{}'",
                self.version, MANIFEST_VERSION
            )));
        }
        if self.default_profile.trim().is_empty() {
            return Err(ConfigError::Validation(
                "default_profile must not be empty".to_string(),
            ));
        }
        for (name, options) in &self.profiles {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation("Empty profile name".to_string()));
            }
            options.validate().map_err(|e| {
                ConfigError::Validation(format!("Profile '{}': {}", name, e))
            })?;
        }
        self.pagination
            .validate()
            .map_err(|e| ConfigError::Validation(format!("pagination: {}", e)))?;
        Ok(())
    }
}
