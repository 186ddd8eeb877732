//! AWS SDK implementation of [`ItemStore`] and table health checks

use crate::cache::config::DynamoDbConfig;
use crate::cache::types::CacheKey;
use crate::dynamodb::{
    CacheItem, ItemStore, ScanPage, ATTR_CACHE_KEY, ATTR_EXPIRY, ATTR_LAST_UPDATED, ATTR_ORIGIN,
    ATTR_VALUE, BATCH_WRITE_LIMIT,
};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, WriteRequest};
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Health status of the cache table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Table is active and responded quickly
    Healthy,
    /// Table responded slowly or is not in the ACTIVE state
    Degraded,
    /// Table could not be described
    Unhealthy,
}

impl HealthStatus {
    /// Check if status is healthy or degraded (operational)
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }
}

/// Result of a table health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub response_time_ms: u64,
    pub table_name: String,
    /// DynamoDB table status, e.g. `ACTIVE`
    pub table_status: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
}

impl HealthCheckResult {
    fn from_table_status(
        table_name: &str,
        table_status: Option<String>,
        response_time: Duration,
        degraded_threshold_ms: u64,
    ) -> Self {
        let response_time_ms = response_time.as_millis() as u64;
        let active = table_status.as_deref() == Some("ACTIVE");
        let status = if !active || response_time_ms > degraded_threshold_ms {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            response_time_ms,
            table_name: table_name.to_string(),
            table_status,
            timestamp: Utc::now(),
            error: None,
        }
    }

    fn unhealthy(table_name: &str, response_time: Duration, error: &CacheError) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            response_time_ms: response_time.as_millis() as u64,
            table_name: table_name.to_string(),
            table_status: None,
            timestamp: Utc::now(),
            error: Some(error.to_string()),
        }
    }
}

/// DynamoDB-backed item store
pub struct DynamoDbStore {
    client: Client,
    table_name: String,
    origin_index: String,
    health_timeout: Duration,
    degraded_threshold_ms: u64,
}

impl DynamoDbStore {
    /// Build a client from the default AWS credential chain
    ///
    /// No request is sent here; an unreachable table shows up on first use
    /// or through [`DynamoDbStore::health_check`].
    pub async fn connect(config: &DynamoDbConfig) -> Result<Self> {
        config.validate()?;

        info!(
            "Connecting to DynamoDB table {} (region: {})",
            config.table_name, config.region
        );

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            debug!("Using DynamoDB endpoint override: {}", endpoint);
            loader = loader.endpoint_url(endpoint.clone());
        }
        let sdk_config = loader.load().await;

        Ok(Self::from_client(Client::new(&sdk_config), config))
    }

    /// Wrap an already configured SDK client
    pub fn from_client(client: Client, config: &DynamoDbConfig) -> Self {
        Self {
            client,
            table_name: config.table_name.clone(),
            origin_index: config.origin_index.clone(),
            health_timeout: Duration::from_secs(5),
            degraded_threshold_ms: 1000,
        }
    }

    /// Override the health check timeout
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Describe the table and time the round trip
    pub async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let request = self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send();

        let outcome = match tokio::time::timeout(self.health_timeout, request).await {
            Ok(Ok(output)) => Ok(output
                .table()
                .and_then(|table| table.table_status())
                .map(|status| status.as_str().to_string())),
            Ok(Err(e)) => Err(backend_error("describe table", e)),
            Err(_) => Err(CacheError::Timeout {
                timeout_seconds: self.health_timeout.as_secs(),
                context: format!("describe table {}", self.table_name),
            }),
        };
        let elapsed = start.elapsed();

        match outcome {
            Ok(table_status) => {
                debug!(
                    "Table {} status {:?} in {:?}",
                    self.table_name, table_status, elapsed
                );
                HealthCheckResult::from_table_status(
                    &self.table_name,
                    table_status,
                    elapsed,
                    self.degraded_threshold_ms,
                )
            }
            Err(e) => {
                warn!("Health check failed for table {}: {}", self.table_name, e);
                HealthCheckResult::unhealthy(&self.table_name, elapsed, &e)
            }
        }
    }

    fn key_attribute(key: &str) -> HashMap<String, AttributeValue> {
        HashMap::from([(ATTR_CACHE_KEY.to_string(), AttributeValue::S(key.to_string()))])
    }
}

#[async_trait]
impl ItemStore for DynamoDbStore {
    async fn get_item(&self, key: &str) -> Result<Option<CacheItem>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(ATTR_CACHE_KEY, AttributeValue::S(key.to_string()))
            .send()
            .await
            .map_err(|e| backend_error("get item", e))?;

        output.item().map(item_from_attributes).transpose()
    }

    async fn put_item(&self, item: CacheItem) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item_to_attributes(&item)))
            .send()
            .await
            .map_err(|e| backend_error("put item", e))?;
        Ok(())
    }

    async fn delete_item(&self, key: &str) -> Result<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(ATTR_CACHE_KEY, AttributeValue::S(key.to_string()))
            .send()
            .await
            .map_err(|e| backend_error("delete item", e))?;
        Ok(())
    }

    async fn scan_keys(&self, start: Option<CacheKey>) -> Result<ScanPage> {
        let output = self
            .client
            .scan()
            .table_name(&self.table_name)
            .projection_expression("#k")
            .expression_attribute_names("#k", ATTR_CACHE_KEY)
            .set_exclusive_start_key(start.as_deref().map(Self::key_attribute))
            .send()
            .await
            .map_err(|e| backend_error("scan", e))?;

        let keys = output
            .items()
            .iter()
            .filter_map(|item| string_attribute(item, ATTR_CACHE_KEY))
            .collect();
        let last_evaluated_key = output
            .last_evaluated_key()
            .and_then(|key| string_attribute(key, ATTR_CACHE_KEY));

        Ok(ScanPage {
            keys,
            last_evaluated_key,
        })
    }

    async fn batch_delete(&self, keys: &[CacheKey]) -> Result<Vec<CacheKey>> {
        let mut unprocessed = Vec::new();

        for chunk in keys.chunks(BATCH_WRITE_LIMIT) {
            let requests = chunk
                .iter()
                .map(|key| {
                    let delete = DeleteRequest::builder()
                        .key(ATTR_CACHE_KEY, AttributeValue::S(key.clone()))
                        .build()
                        .map_err(|e| CacheError::Backend(e.to_string()))?;
                    Ok(WriteRequest::builder().delete_request(delete).build())
                })
                .collect::<Result<Vec<_>>>()?;

            let output = self
                .client
                .batch_write_item()
                .request_items(self.table_name.clone(), requests)
                .send()
                .await
                .map_err(|e| backend_error("batch write", e))?;

            if let Some(requests) = output
                .unprocessed_items()
                .and_then(|items| items.get(&self.table_name))
            {
                unprocessed.extend(requests.iter().filter_map(|request| {
                    request
                        .delete_request()
                        .and_then(|delete| string_attribute(delete.key(), ATTR_CACHE_KEY))
                }));
            }
        }

        Ok(unprocessed)
    }

    async fn query_origin(&self, origin: &str) -> Result<Vec<CacheItem>> {
        let mut items = Vec::new();
        let mut start: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(&self.origin_index)
                .key_condition_expression("#o = :origin")
                .expression_attribute_names("#o", ATTR_ORIGIN)
                .expression_attribute_values(":origin", AttributeValue::S(origin.to_string()))
                .set_exclusive_start_key(start.take())
                .send()
                .await
                .map_err(|e| backend_error("query origin index", e))?;

            for raw in output.items() {
                match item_from_attributes(raw) {
                    Ok(item) => items.push(item),
                    Err(e) => warn!("Skipping unreadable item for origin {}: {}", origin, e),
                }
            }

            match output.last_evaluated_key() {
                Some(key) => start = Some(key.clone()),
                None => break,
            }
        }

        Ok(items)
    }
}

fn backend_error<E: std::error::Error>(context: &str, err: E) -> CacheError {
    CacheError::Backend(format!("{}: {}", context, DisplayErrorContext(&err)))
}

fn string_attribute(item: &HashMap<String, AttributeValue>, name: &str) -> Option<String> {
    item.get(name).and_then(|v| v.as_s().ok()).cloned()
}

fn number_attribute(item: &HashMap<String, AttributeValue>, name: &str) -> Result<i64> {
    let raw = item
        .get(name)
        .and_then(|v| v.as_n().ok())
        .ok_or_else(|| CacheError::Serialization(format!("missing numeric attribute {}", name)))?;
    raw.parse()
        .map_err(|_| CacheError::Serialization(format!("attribute {} is not an integer: {}", name, raw)))
}

pub(crate) fn item_to_attributes(item: &CacheItem) -> HashMap<String, AttributeValue> {
    let mut attributes = HashMap::from([
        (ATTR_CACHE_KEY.to_string(), AttributeValue::S(item.cache_key.clone())),
        (ATTR_VALUE.to_string(), AttributeValue::S(item.value.clone())),
        (ATTR_EXPIRY.to_string(), AttributeValue::N(item.expiry.to_string())),
        (
            ATTR_LAST_UPDATED.to_string(),
            AttributeValue::N(item.last_updated.to_string()),
        ),
    ]);

    // Index key attributes may not be empty strings
    if let Some(origin) = item.feedback_id.as_ref().filter(|o| !o.is_empty()) {
        attributes.insert(ATTR_ORIGIN.to_string(), AttributeValue::S(origin.clone()));
    }

    attributes
}

pub(crate) fn item_from_attributes(item: &HashMap<String, AttributeValue>) -> Result<CacheItem> {
    let cache_key = string_attribute(item, ATTR_CACHE_KEY)
        .ok_or_else(|| CacheError::Serialization("missing attribute cache_key".to_string()))?;
    let value = string_attribute(item, ATTR_VALUE)
        .ok_or_else(|| CacheError::Serialization("missing attribute value".to_string()))?;

    Ok(CacheItem {
        cache_key,
        value,
        expiry: number_attribute(item, ATTR_EXPIRY)?,
        last_updated: number_attribute(item, ATTR_LAST_UPDATED).unwrap_or(0),
        feedback_id: string_attribute(item, ATTR_ORIGIN),
    })
}
