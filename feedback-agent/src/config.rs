//! Agent configuration from the environment

use crate::error::{AgentError, Result};
use crate::llm::Provider;
use feedback_cache::CacheConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub provider: Provider,
    /// Explicit model; the provider default applies when unset
    pub model: Option<String>,
    pub use_cache: bool,
    pub cache: CacheConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            use_cache: true,
            cache: CacheConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Load from the process environment, reading `.env` when present
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    ///
    /// Reads `LLM_PROVIDER`, `LLM_MODEL` and `USE_CACHE`, plus everything
    /// [`CacheConfig::from_lookup`] reads.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup("LLM_PROVIDER") {
            Some(provider) => provider.parse()?,
            None => Provider::default(),
        };

        let use_cache = match lookup("USE_CACHE") {
            Some(flag) => parse_flag(&flag)?,
            None => true,
        };

        Ok(Self {
            provider,
            model: lookup("LLM_MODEL").filter(|model| !model.trim().is_empty()),
            use_cache,
            cache: CacheConfig::from_lookup(&lookup)?,
        })
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(AgentError::Config(format!(
            "USE_CACHE must be true or false, got {:?}",
            other
        ))),
    }
}
