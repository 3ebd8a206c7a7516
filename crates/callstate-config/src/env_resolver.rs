//! `${VAR}` / `${VAR:default}` substitution over a parsed manifest

use regex::Regex;
use serde_json::Value as JsonValue;
use std::env;
use thiserror::Error;

const REFERENCE_PATTERN: &str = r"\$\{([^}:]+)(?::([^}]*))?\}";

#[derive(Debug, Error)]
pub enum EnvResolverError {
    #[error("Environment variable '{0}' not found and no default provided")]
    VarNotFound(String),
    #[error("Environment variable '{0}' is not in whitelist. Allowed prefixes: {1:?}")]
    VarNotWhitelisted(String, Vec<String>),
    #[error("Variable references in '{0}' did not settle after {1} passes")]
    TooDeep(String, usize),
    #[error("Invalid reference pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Substitutes environment references in string leaves of a JSON tree.
///
/// Only variables starting with an allowed prefix may be read; an empty
/// prefix list allows everything.
#[derive(Debug, Clone)]
pub struct EnvResolver {
    allowed_prefixes: Vec<String>,
    max_passes: usize,
}

impl Default for EnvResolver {
    fn default() -> Self {
        Self::new(vec!["CALLSTATE_".to_string(), "APP_".to_string()])
    }
}

impl EnvResolver {
    pub fn new(allowed_prefixes: Vec<String>) -> Self {
        Self {
            allowed_prefixes,
            max_passes: 10,
        }
    }

    pub fn unrestricted() -> Self {
        Self::new(Vec::new())
    }

    /// Bound on re-substitution when a variable's value holds more references
    pub fn with_max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes.max(1);
        self
    }

    pub fn resolve(&self, value: &JsonValue) -> Result<JsonValue, EnvResolverError> {
        let pattern = Regex::new(REFERENCE_PATTERN)?;
        self.resolve_value(value, &pattern)
    }

    /// Check every reference against the whitelist without reading the environment
    pub fn validate_all_vars(&self, value: &JsonValue) -> Result<(), EnvResolverError> {
        let pattern = Regex::new(REFERENCE_PATTERN)?;
        self.check_value(value, &pattern)
    }

    fn resolve_value(
        &self,
        value: &JsonValue,
        pattern: &Regex,
    ) -> Result<JsonValue, EnvResolverError> {
        match value {
            JsonValue::String(s) => self.resolve_string(s, pattern),
            JsonValue::Object(obj) => obj
                .iter()
                .map(|(key, val)| Ok((key.clone(), self.resolve_value(val, pattern)?)))
                .collect::<Result<serde_json::Map<_, _>, _>>()
                .map(JsonValue::Object),
            JsonValue::Array(arr) => arr
                .iter()
                .map(|item| self.resolve_value(item, pattern))
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Array),
            other => Ok(other.clone()),
        }
    }

    fn resolve_string(&self, input: &str, pattern: &Regex) -> Result<JsonValue, EnvResolverError> {
        if !input.contains("${") {
            return Ok(JsonValue::String(input.to_string()));
        }

        let mut current = input.to_string();
        for _ in 0..self.max_passes {
            if !pattern.is_match(&current) {
                return Ok(coerce(current));
            }
            let mut next = String::with_capacity(current.len());
            let mut last = 0;
            for caps in pattern.captures_iter(&current) {
                let Some(whole) = caps.get(0) else { continue };
                let name = &caps[1];
                self.check_name(name)?;
                let value = match (env::var(name), caps.get(2)) {
                    (Ok(value), _) => value,
                    (Err(_), Some(default)) => default.as_str().to_string(),
                    (Err(_), None) => return Err(EnvResolverError::VarNotFound(name.to_string())),
                };
                next.push_str(&current[last..whole.start()]);
                next.push_str(&value);
                last = whole.end();
            }
            next.push_str(&current[last..]);
            current = next;
        }

        if pattern.is_match(&current) {
            return Err(EnvResolverError::TooDeep(input.to_string(), self.max_passes));
        }
        Ok(coerce(current))
    }

    fn check_value(&self, value: &JsonValue, pattern: &Regex) -> Result<(), EnvResolverError> {
        match value {
            JsonValue::String(s) => pattern
                .captures_iter(s)
                .try_for_each(|caps| self.check_name(&caps[1])),
            JsonValue::Object(obj) => obj.values().try_for_each(|v| self.check_value(v, pattern)),
            JsonValue::Array(arr) => arr.iter().try_for_each(|v| self.check_value(v, pattern)),
            _ => Ok(()),
        }
    }

    fn check_name(&self, name: &str) -> Result<(), EnvResolverError> {
        if self.allowed_prefixes.is_empty()
            || self.allowed_prefixes.iter().any(|p| name.starts_with(p))
        {
            return Ok(());
        }
        Err(EnvResolverError::VarNotWhitelisted(
            name.to_string(),
            self.allowed_prefixes.clone(),
        ))
    }
}

/// Substituted text becomes a bool, integer or float when it parses as one,
/// so numeric option fields can come from the environment.
fn coerce(text: String) -> JsonValue {
    if let Ok(flag) = text.parse::<bool>() {
        return JsonValue::Bool(flag);
    }
    if let Ok(int) = text.parse::<u64>() {
        return JsonValue::from(int);
    }
    if let Ok(int) = text.parse::<i64>() {
        return JsonValue::from(int);
    }
    match text.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        Some(num) => JsonValue::Number(num),
        None => JsonValue::String(text),
    }
}
