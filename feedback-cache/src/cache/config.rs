//! Configuration for the cache system

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default time-to-live for cached results (1 hour)
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Backend selected for a `CacheManager`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    /// Process-local map, lost on restart
    Memory,
    /// Shared DynamoDB table
    Persistent,
}

impl FromStr for CacheType {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheType::Memory),
            "persistent" | "dynamodb" => Ok(CacheType::Persistent),
            other => Err(CacheError::Config(format!(
                "unsupported cache type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheType::Memory => write!(f, "memory"),
            CacheType::Persistent => write!(f, "persistent"),
        }
    }
}

/// Connection parameters for the DynamoDB table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamoDbConfig {
    /// Table whose partition key is `cache_key`
    pub table_name: String,

    /// AWS region
    pub region: String,

    /// Endpoint override, e.g. DynamoDB Local
    pub endpoint_url: Option<String>,

    /// Global secondary index keyed on `feedback_id`
    pub origin_index: String,
}

impl Default for DynamoDbConfig {
    fn default() -> Self {
        Self {
            table_name: "LLMAgentCache".to_string(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
            origin_index: "feedback_id-index".to_string(),
        }
    }
}

impl DynamoDbConfig {
    /// Validate the connection parameters
    pub fn validate(&self) -> Result<()> {
        if self.table_name.trim().is_empty() {
            return Err(CacheError::Config("table_name must not be empty".to_string()));
        }

        if self.region.trim().is_empty() {
            return Err(CacheError::Config("region must not be empty".to_string()));
        }

        if self.origin_index.trim().is_empty() {
            return Err(CacheError::Config("origin_index must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Configuration for a `CacheManager`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Which backend to construct
    pub cache_type: CacheType,

    /// Lifetime of every entry written through the manager
    pub ttl: Duration,

    /// Used only when `cache_type` is `Persistent`
    pub dynamodb: DynamoDbConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: CacheType::Memory,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            dynamodb: DynamoDbConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.ttl.as_secs() == 0 {
            return Err(CacheError::Config(
                "ttl must be at least one second".to_string(),
            ));
        }

        if self.cache_type == CacheType::Persistent {
            self.dynamodb.validate()?;
        }

        Ok(())
    }

    /// Load configuration from the process environment
    ///
    /// Reads a `.env` file first when one is present. Recognized variables:
    /// `CACHE_TYPE`, `CACHE_TTL`, `DYNAMODB_TABLE`, `AWS_REGION`,
    /// `DYNAMODB_ENDPOINT_URL`, `DYNAMODB_ORIGIN_INDEX`. Unset variables keep
    /// their defaults; malformed ones are configuration errors.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(cache_type) = lookup("CACHE_TYPE") {
            builder = builder.cache_type(cache_type.parse()?);
        }

        if let Some(ttl) = lookup("CACHE_TTL") {
            let secs: u64 = ttl.trim().parse().map_err(|_| {
                CacheError::Config(format!("CACHE_TTL must be an integer, got {:?}", ttl))
            })?;
            builder = builder.ttl(Duration::from_secs(secs));
        }

        if let Some(table) = lookup("DYNAMODB_TABLE") {
            builder = builder.table_name(table);
        }

        if let Some(region) = lookup("AWS_REGION") {
            builder = builder.region(region);
        }

        if let Some(endpoint) = lookup("DYNAMODB_ENDPOINT_URL") {
            builder = builder.endpoint_url(endpoint);
        }

        if let Some(index) = lookup("DYNAMODB_ORIGIN_INDEX") {
            builder = builder.origin_index(index);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    cache_type: Option<CacheType>,
    ttl: Option<Duration>,
    table_name: Option<String>,
    region: Option<String>,
    endpoint_url: Option<String>,
    origin_index: Option<String>,
}

impl CacheConfigBuilder {
    /// Select the backend
    pub fn cache_type(mut self, cache_type: CacheType) -> Self {
        self.cache_type = Some(cache_type);
        self
    }

    /// Set the entry time-to-live
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the DynamoDB table name
    pub fn table_name(mut self, table: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self
    }

    /// Set the AWS region
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Point the client at a custom endpoint
    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    /// Set the secondary index used for lookup by origin
    pub fn origin_index(mut self, index: impl Into<String>) -> Self {
        self.origin_index = Some(index.into());
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            cache_type: self.cache_type.unwrap_or(defaults.cache_type),
            ttl: self.ttl.unwrap_or(defaults.ttl),
            dynamodb: DynamoDbConfig {
                table_name: self.table_name.unwrap_or(defaults.dynamodb.table_name),
                region: self.region.unwrap_or(defaults.dynamodb.region),
                endpoint_url: self.endpoint_url.or(defaults.dynamodb.endpoint_url),
                origin_index: self.origin_index.unwrap_or(defaults.dynamodb.origin_index),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.cache_type, CacheType::Memory);
        assert_eq!(config.ttl, Duration::from_secs(3600));
        assert_eq!(config.dynamodb.table_name, "LLMAgentCache");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cache_type_parsing() {
        assert_eq!("memory".parse::<CacheType>().unwrap(), CacheType::Memory);
        assert_eq!("Persistent".parse::<CacheType>().unwrap(), CacheType::Persistent);
        assert_eq!("dynamodb".parse::<CacheType>().unwrap(), CacheType::Persistent);

        let err = "redis".parse::<CacheType>().unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));
        assert!(err.to_string().contains("redis"));
    }

    #[test]
    fn test_config_validation() {
        let zero_ttl = CacheConfig::builder().ttl(Duration::from_millis(500)).build();
        assert!(zero_ttl.validate().is_err());

        let no_table = CacheConfig::builder()
            .cache_type(CacheType::Persistent)
            .table_name("")
            .build();
        assert!(no_table.validate().is_err());

        // Table parameters are irrelevant to the memory backend
        let memory = CacheConfig::builder().table_name("").build();
        assert!(memory.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::builder()
            .cache_type(CacheType::Persistent)
            .ttl(Duration::from_secs(600))
            .table_name("FeedbackCache")
            .region("eu-west-1")
            .endpoint_url("http://localhost:8000")
            .build();

        assert_eq!(config.cache_type, CacheType::Persistent);
        assert_eq!(config.ttl, Duration::from_secs(600));
        assert_eq!(config.dynamodb.table_name, "FeedbackCache");
        assert_eq!(config.dynamodb.region, "eu-west-1");
        assert_eq!(
            config.dynamodb.endpoint_url.as_deref(),
            Some("http://localhost:8000")
        );
        assert_eq!(config.dynamodb.origin_index, "feedback_id-index");
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("CACHE_TYPE", "dynamodb"),
            ("CACHE_TTL", "120"),
            ("DYNAMODB_TABLE", "Results"),
        ]
        .into_iter()
        .collect();

        let config =
            CacheConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.cache_type, CacheType::Persistent);
        assert_eq!(config.ttl, Duration::from_secs(120));
        assert_eq!(config.dynamodb.table_name, "Results");
        assert_eq!(config.dynamodb.region, "us-east-1");
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let bad_ttl = CacheConfig::from_lookup(|name| {
            (name == "CACHE_TTL").then(|| "soon".to_string())
        });
        assert!(matches!(bad_ttl, Err(CacheError::Config(_))));

        let bad_type = CacheConfig::from_lookup(|name| {
            (name == "CACHE_TYPE").then(|| "redis".to_string())
        });
        assert!(matches!(bad_type, Err(CacheError::Config(_))));
    }
}
