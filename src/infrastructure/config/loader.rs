//! Configuration loading with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Environment variable carrying a JSON-encoded strategy list, e.g.
/// `[{"parent_chunk_size":2000,"child_chunk_size":800,"overlap_percent":25}]`.
const STRATEGIES_ENV: &str = "RECALL_CHUNK_STRATEGIES";

/// Configuration error types. All are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database URL cannot be empty")]
    EmptyDatabaseUrl,

    #[error("Invalid chunk strategies: {0}")]
    InvalidStrategies(String),

    #[error("Invalid embedding max_batch_size: {0}. Must be at least 1")]
    InvalidMaxBatchSize(usize),

    #[error("Invalid summary max_tokens: {0}. Must be at least 1")]
    InvalidSummaryTokens(u32),

    #[error("Invalid summary concurrency: {0}. Must be at least 1")]
    InvalidSummaryConcurrency(usize),
}

/// Configuration loader.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `recall.yaml` in the working directory
    /// 3. Environment variables (`RECALL_` prefix, `__` nesting separator)
    ///
    /// `RECALL_CHUNK_STRATEGIES` is a JSON-encoded list and handled
    /// separately from the figment merge.
    pub fn load() -> Result<Config> {
        let mut config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file("recall.yaml"))
            .merge(
                Env::prefixed("RECALL_")
                    .split("__")
                    .ignore(&["chunk_strategies"]),
            )
            .extract()
            .context("Failed to extract configuration")?;

        if let Ok(raw) = std::env::var(STRATEGIES_ENV) {
            config.chunk_strategies = serde_json::from_str(&raw)
                .map_err(|e| ConfigError::InvalidStrategies(e.to_string()))?;
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.url.is_empty() {
            return Err(ConfigError::EmptyDatabaseUrl);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.embedding_api.max_batch_size == 0 {
            return Err(ConfigError::InvalidMaxBatchSize(
                config.embedding_api.max_batch_size,
            ));
        }

        if config.summary.max_tokens == 0 {
            return Err(ConfigError::InvalidSummaryTokens(config.summary.max_tokens));
        }

        if config.summary.concurrency == 0 {
            return Err(ConfigError::InvalidSummaryConcurrency(
                config.summary.concurrency,
            ));
        }

        if config.chunk_strategies.is_empty() {
            return Err(ConfigError::InvalidStrategies(
                "at least one strategy is required".to_string(),
            ));
        }
        for strategy in &config.chunk_strategies {
            strategy
                .validate()
                .map_err(|e| ConfigError::InvalidStrategies(e.to_string()))?;
        }

        Ok(())
    }
}
