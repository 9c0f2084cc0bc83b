//! Service configuration tree.
//!
//! Values are merged by the loader: programmatic defaults, then `recall.yaml`,
//! then `RECALL_*` environment variables.

use serde::{Deserialize, Serialize};

use crate::domain::models::chunk::ChunkStrategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub chat_api: ChatApiConfig,
    #[serde(default)]
    pub embedding_api: EmbeddingApiConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_chunk_strategies")]
    pub chunk_strategies: Vec<ChunkStrategy>,
}

fn default_chunk_strategies() -> Vec<ChunkStrategy> {
    vec![ChunkStrategy::default()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            chat_api: ChatApiConfig::default(),
            embedding_api: EmbeddingApiConfig::default(),
            summary: SummaryConfig::default(),
            logging: LoggingConfig::default(),
            chunk_strategies: default_chunk_strategies(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Include error messages in failure responses.
    pub development: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            development: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite URL, e.g. `sqlite:recall.db`.
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:recall.db".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatApiConfig {
    /// Base URL of an OpenAI-compatible chat API.
    pub base_url: String,
    /// API key. Falls back to `RECALL_CHAT_API__API_KEY` via the loader.
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ChatApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingApiConfig {
    /// Base URL of an OpenAI-compatible embeddings API.
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    /// Maximum texts per single remote call.
    pub max_batch_size: usize,
}

impl Default for EmbeddingApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            timeout_secs: 30,
            max_batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    pub max_tokens: u32,
    /// Bounded fan-out for per-parent summary requests.
    pub concurrency: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            max_tokens: 200,
            concurrency: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error
    pub level: String,
    /// json or pretty
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
