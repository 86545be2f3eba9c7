//! LLM configuration
//!
//! `LlmConfig` is an immutable value object. It can be built in code, read
//! from `STRIGOI_LLM*` environment variables, or loaded from the `[llm]`
//! table of a TOML file:
//!
//! ```toml
//! [llm]
//! model = "openai/gpt-4o"
//! api_key = "sk-..."
//! timeout_secs = 120
//!
//! [llm.params]
//! temperature = 0.2
//! ```

use crate::error::{Error, Result};
use crate::provider::ProviderKind;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

pub const ENV_MODEL: &str = "STRIGOI_LLM";
pub const ENV_API_KEY: &str = "STRIGOI_LLM_API_KEY";
pub const ENV_API_KEY_FALLBACK: &str = "LLM_API_KEY";
pub const ENV_TIMEOUT: &str = "STRIGOI_LLM_TIMEOUT";
pub const ENV_BASE_URL: &str = "STRIGOI_LLM_BASE_URL";

/// Configuration for one LLM instance.
///
/// `extra` holds provider-specific parameters (temperature, max_tokens, ...)
/// that are copied into the request body unmodified.
#[derive(Clone, PartialEq)]
pub struct LlmConfig {
    model: String,
    api_key: String,
    timeout: Duration,
    base_url: Option<String>,
    extra: Map<String, Value>,
}

impl LlmConfig {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            base_url: None,
            extra: Map::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Add a passthrough parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// The credential with everything but the last four characters hidden
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let visible: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), visible)
    }

    /// Check the invariants a transport relies on
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::config_invalid("model must not be empty")
                .with_operation("config::validate"));
        }
        if let Some((_, name)) = self.model.split_once('/') {
            if name.trim().is_empty() {
                return Err(Error::config_invalid(format!(
                    "model '{}' has a provider prefix but no model name",
                    self.model
                ))
                .with_operation("config::validate")
                .with_context("model", self.model.clone()));
            }
        }
        if let Err(e) = ProviderKind::resolve(&self.model) {
            return Err(Error::unsupported(e.to_string())
                .with_operation("config::validate")
                .with_context("model", self.model.clone()));
        }
        if self.timeout.is_zero() {
            return Err(Error::config_invalid("timeout must be greater than zero")
                .with_operation("config::validate"));
        }
        Ok(())
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup using the environment variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model = lookup(ENV_MODEL)
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| {
                Error::config_invalid(format!("{} is not set", ENV_MODEL))
                    .with_operation("config::from_env")
            })?;

        let api_key = lookup(ENV_API_KEY)
            .or_else(|| lookup(ENV_API_KEY_FALLBACK))
            .unwrap_or_default();

        let mut config = Self::new(model, api_key);

        if let Some(raw) = lookup(ENV_TIMEOUT) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                Error::config_invalid(format!("{} must be a number of seconds", ENV_TIMEOUT))
                    .with_operation("config::from_env")
                    .with_context("value", raw.clone())
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|u| !u.is_empty()) {
            config.base_url = Some(base_url);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse the `[llm]` table of a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| {
            Error::parse_failed(format!("invalid config: {}", e))
                .with_operation("config::from_toml_str")
                .set_source(e)
        })?;

        let section = file.llm;
        let config = Self {
            model: section.model,
            api_key: section.api_key.unwrap_or_default(),
            timeout: Duration::from_secs(section.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            base_url: section.base_url,
            extra: section.params,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e)
                .with_operation("config::load")
                .with_context("path", path.display().to_string())
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| e.with_context("path", path.display().to_string()))
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("model", &self.model)
            .field("api_key", &self.masked_api_key())
            .field("timeout", &self.timeout)
            .field("base_url", &self.base_url)
            .field("extra", &self.extra)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    llm: LlmSection,
}

#[derive(Debug, Deserialize)]
struct LlmSection {
    model: String,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    base_url: Option<String>,
    #[serde(default)]
    params: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use strigoi_error::ErrorKind;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_builder() {
        let config = LlmConfig::new("openai/gpt-4", "test-key")
            .with_timeout(Duration::from_secs(30))
            .with_param("temperature", 0.2);

        assert_eq!(config.model(), "openai/gpt-4");
        assert_eq!(config.api_key(), "test-key");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.extra()["temperature"], serde_json::json!(0.2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let err = LlmConfig::new("", "k").validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);

        let err = LlmConfig::new("openai/", "k").validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);

        let err = LlmConfig::new("mystery/model-1", "k").validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(err.context_value("model"), Some("mystery/model-1"));

        let err = LlmConfig::new("openai/gpt-4", "k")
            .with_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_masked_api_key() {
        assert_eq!(LlmConfig::new("m", "sk-abcdef").masked_api_key(), "*****cdef");
        assert_eq!(LlmConfig::new("m", "abc").masked_api_key(), "***");

        let debug = format!("{:?}", LlmConfig::new("m", "sk-secret-value"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn test_from_lookup() {
        let vars = env(&[
            (ENV_MODEL, "anthropic/claude-sonnet-4-20250514"),
            (ENV_API_KEY_FALLBACK, "fallback-key"),
            (ENV_TIMEOUT, "45"),
        ]);
        let config = LlmConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.model(), "anthropic/claude-sonnet-4-20250514");
        assert_eq!(config.api_key(), "fallback-key");
        assert_eq!(config.timeout(), Duration::from_secs(45));
        assert_eq!(config.base_url(), None);
    }

    #[test]
    fn test_from_lookup_requires_model() {
        let vars = env(&[(ENV_API_KEY, "k")]);
        let err = LlmConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.message().contains(ENV_MODEL));
    }

    #[test]
    fn test_from_lookup_bad_timeout() {
        let vars = env(&[(ENV_MODEL, "openai/gpt-4"), (ENV_TIMEOUT, "soon")]);
        let err = LlmConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(err.context_value("value"), Some("soon"));
    }

    #[test]
    fn test_from_toml_str() {
        let config = LlmConfig::from_toml_str(
            r#"
            [llm]
            model = "ollama/llama3"
            timeout_secs = 60
            base_url = "http://localhost:11434/v1"

            [llm.params]
            temperature = 0.5
            max_tokens = 512
            "#,
        )
        .unwrap();

        assert_eq!(config.model(), "ollama/llama3");
        assert_eq!(config.api_key(), "");
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.base_url(), Some("http://localhost:11434/v1"));
        assert_eq!(config.extra()["max_tokens"], serde_json::json!(512));
    }

    #[test]
    fn test_from_toml_str_unknown_provider() {
        let err = LlmConfig::from_toml_str("[llm]\nmodel = \"mystery/model-1\"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_from_toml_str_parse_error() {
        let err = LlmConfig::from_toml_str("[llm]\ntimeout_secs = 3").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailed);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[llm]\nmodel = \"openai/gpt-4\"\napi_key = \"test-key\"").unwrap();

        let config = LlmConfig::load(file.path()).unwrap();
        assert_eq!(config, LlmConfig::new("openai/gpt-4", "test-key"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = LlmConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert!(err.context_value("path").is_some());
    }
}
