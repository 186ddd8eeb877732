//! Request processing with cached tool results
//!
//! A request is fingerprinted from its text, instructions and tool list. On
//! a hit the cached `AnalysisResult` is returned without running any tool;
//! on a miss every requested tool runs and the combined result is stored.

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::input::{BatchInput, FeedbackInput};
use crate::llm::LlmClient;
use crate::tools::ToolRegistry;
use feedback_cache::{derive_cache_key, CacheKey, CacheManager};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Combined output of the tools run for one feedback record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub feedback_id: String,
    pub results: BTreeMap<String, Value>,
}

impl AnalysisResult {
    /// Whether any tool reported an error instead of a result
    pub fn has_errors(&self) -> bool {
        self.results
            .values()
            .any(|value| value.get("error").is_some())
    }
}

/// Runs analysis tools for feedback records
pub struct ToolAgent {
    registry: ToolRegistry,
    cache: Option<Arc<CacheManager>>,
}

impl ToolAgent {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            cache: None,
        }
    }

    /// Agent with the built-in tools answered by `client`
    ///
    /// The cache is constructed only when `config.use_cache` is set. Fails if
    /// the client belongs to a different provider than configured.
    pub async fn from_config(config: &AgentConfig, client: Arc<dyn LlmClient>) -> Result<Self> {
        if client.provider() != config.provider {
            return Err(AgentError::Config(format!(
                "client provider {} does not match configured provider {}",
                client.provider(),
                config.provider
            )));
        }
        if client.model() != config.model() {
            warn!(
                "Client model {} differs from configured model {}",
                client.model(),
                config.model()
            );
        }
        info!("Using {} model {}", config.provider, client.model());

        let agent = Self::new(ToolRegistry::with_llm(client));
        if !config.use_cache {
            info!("Result cache disabled");
            return Ok(agent);
        }

        let cache = CacheManager::from_config(&config.cache).await?;
        Ok(agent.with_cache(Arc::new(cache)))
    }

    /// Consult and populate `cache` for every request
    pub fn with_cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&Arc<CacheManager>> {
        self.cache.as_ref()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Analyze one record with the named tools
    ///
    /// Unknown or failing tools yield `{"error": ...}` under their name; the
    /// rest of the request still completes. Results containing tool errors
    /// are returned but not cached.
    pub async fn process_request(
        &self,
        input: &FeedbackInput,
        tools: &[String],
    ) -> Result<AnalysisResult> {
        input.validate()?;
        info!(
            "Processing feedback {} with tools: {:?}",
            input.feedback_id, tools
        );

        let key = match &self.cache {
            Some(cache) => {
                let key = derive_cache_key(&input.feedback_text, input.instructions(), tools)?;
                if let Some(mut result) = self.cached(cache, &key).await {
                    // The key ignores the id, so the hit may come from another record
                    result.feedback_id = input.feedback_id.clone();
                    return Ok(result);
                }
                Some(key)
            }
            None => None,
        };

        let mut results = BTreeMap::new();
        for name in tools {
            let outcome = match self.registry.get(name) {
                Ok(tool) => tool.execute(input).await,
                Err(e) => Err(e),
            };

            let value = match outcome {
                Ok(value) => value,
                Err(e) => {
                    error!("Tool {} failed for {}: {}", name, input.feedback_id, e);
                    json!({ "error": e.to_string() })
                }
            };
            results.insert(name.clone(), value);
        }

        let result = AnalysisResult {
            feedback_id: input.feedback_id.clone(),
            results,
        };

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            if result.has_errors() {
                debug!("Not caching result with tool errors for {}", input.feedback_id);
            } else {
                cache
                    .set_with_origin(key, serde_json::to_value(&result)?, Some(&input.feedback_id))
                    .await;
            }
        }

        Ok(result)
    }

    /// Analyze every record of a batch concurrently, preserving order
    pub async fn process_batch(
        &self,
        batch: &BatchInput,
        tools: &[String],
    ) -> Result<Vec<Result<AnalysisResult>>> {
        batch.validate()?;
        info!("Processing batch of {} feedback records", batch.feedback.len());

        Ok(join_all(
            batch
                .feedback
                .iter()
                .map(|input| self.process_request(input, tools)),
        )
        .await)
    }

    async fn cached(&self, cache: &CacheManager, key: &CacheKey) -> Option<AnalysisResult> {
        let value = cache.get(key).await?;

        match serde_json::from_value(value) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("Discarding undecodable cached result {}: {}", key, e);
                cache.delete(key).await;
                None
            }
        }
    }
}
