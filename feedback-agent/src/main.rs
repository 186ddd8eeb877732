use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feedback_agent::{default_tools, AgentConfig, Submission};
use feedback_cache::cache::fingerprint;
use feedback_cache::{derive_cache_key, CacheConfig, CacheManager, CacheType, DynamoDbStore};

#[derive(Parser)]
#[command(name = "feedback")]
#[command(about = "Feedback analysis cache tooling", long_about = None)]
struct Cli {
    /// Cache backend (memory or persistent); overrides CACHE_TYPE
    #[arg(long)]
    cache_type: Option<CacheType>,

    /// Entry lifetime in seconds; overrides CACHE_TTL
    #[arg(long)]
    ttl: Option<u64>,

    /// DynamoDB table; overrides DYNAMODB_TABLE
    #[arg(long)]
    table: Option<String>,

    /// AWS region; overrides AWS_REGION
    #[arg(long)]
    region: Option<String>,

    /// DynamoDB endpoint, e.g. http://localhost:8000
    #[arg(long)]
    endpoint_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cache key for a request
    Key {
        /// Feedback text
        #[arg(short, long)]
        text: String,

        /// Analysis instructions
        #[arg(short, long, default_value = "")]
        instructions: String,

        /// Tool name; repeat for several (default: all tools)
        #[arg(long = "tool")]
        tools: Vec<String>,
    },

    /// Validate a feedback JSON file (single record or batch)
    Validate {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// Inspect or modify the configured cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Print the cached value for a key
    Get { key: String },

    /// Delete a key
    Delete { key: String },

    /// Delete every entry
    Clear {
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },

    /// List live entries written for a feedback id
    Origin { feedback_id: String },

    /// Check that the DynamoDB table is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "feedback_agent=info,feedback_cache=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Key {
            ref text,
            ref instructions,
            ref tools,
        } => {
            let tools = if tools.is_empty() {
                default_tools()
            } else {
                tools.clone()
            };
            println!("{}", derive_cache_key(text, instructions, &tools)?);
        }

        Commands::Validate { ref file } => {
            let json = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;

            match Submission::from_json(&json) {
                Ok(submission) => {
                    let records = submission.records();
                    println!("Valid: {} feedback record(s)", records.len());
                    for record in records {
                        println!("  - {}", record.feedback_id);
                    }
                }
                Err(e) => {
                    let response = e.to_response("unknown");
                    println!("{}", serde_json::to_string_pretty(&response)?);
                    bail!("{} is not a valid submission", file.display());
                }
            }
        }

        Commands::Cache { ref action } => {
            let config = cache_config(&cli)?;

            match action {
                CacheAction::Health => {
                    if config.cache_type != CacheType::Persistent {
                        println!("Memory cache: nothing to check");
                        return Ok(());
                    }

                    let store = DynamoDbStore::connect(&config.dynamodb).await?;
                    let result = store.health_check().await;
                    println!("{}", serde_json::to_string_pretty(&result)?);
                    if !result.status.is_operational() {
                        bail!("Table {} is unhealthy", result.table_name);
                    }
                }

                CacheAction::Get { key } => {
                    check_key(key)?;
                    let cache = CacheManager::from_config(&config).await?;
                    match cache.get(key).await {
                        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                        None => println!("No entry for {}", key),
                    }
                }

                CacheAction::Delete { key } => {
                    check_key(key)?;
                    let cache = CacheManager::from_config(&config).await?;
                    cache.delete(key).await;
                    println!("Deleted {}", key);
                }

                CacheAction::Clear { yes } => {
                    if !yes {
                        bail!("Refusing to clear the {} cache without --yes", config.cache_type);
                    }
                    let cache = CacheManager::from_config(&config).await?;
                    cache.clear().await;
                    println!("Cache cleared");
                }

                CacheAction::Origin { feedback_id } => {
                    let cache = CacheManager::from_config(&config).await?;
                    let records = cache.find_by_origin(feedback_id).await;
                    if records.is_empty() {
                        println!("No entries for {}", feedback_id);
                    }
                    for record in records {
                        println!("{}", record.key);
                        println!("{}", serde_json::to_string_pretty(&record.value)?);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Environment configuration with command-line overrides applied
fn cache_config(cli: &Cli) -> Result<CacheConfig> {
    let mut config = AgentConfig::from_env()?.cache;

    if let Some(cache_type) = cli.cache_type {
        config.cache_type = cache_type;
    }
    if let Some(ttl) = cli.ttl {
        config.ttl = Duration::from_secs(ttl);
    }
    if let Some(table) = &cli.table {
        config.dynamodb.table_name = table.clone();
    }
    if let Some(region) = &cli.region {
        config.dynamodb.region = region.clone();
    }
    if let Some(endpoint) = &cli.endpoint_url {
        config.dynamodb.endpoint_url = Some(endpoint.clone());
    }

    config.validate()?;
    Ok(config)
}

fn check_key(key: &str) -> Result<()> {
    if !fingerprint::is_valid_key(key) {
        bail!("{:?} is not a cache key (expected 64 lowercase hex characters)", key);
    }
    Ok(())
}
