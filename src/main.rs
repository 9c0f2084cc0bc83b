//! Recall service entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use recall::adapters::openai::{OpenAiChatClient, OpenAiEmbeddingProvider};
use recall::adapters::sqlite::{Database, SqliteChunkRepository, SqliteDocumentRepository};
use recall::api::{serve, AppState};
use recall::infrastructure::config::ConfigLoader;
use recall::infrastructure::logging;
use recall::services::{
    Embedder, IngestionService, QueryTransformer, Reranker, Retriever, Summarizer,
};

#[derive(Parser)]
#[command(name = "recall", about = "Document retrieval service", version)]
struct Cli {
    /// Path to a configuration file (defaults to recall.yaml + environment).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service (default).
    Serve {
        /// Override the configured port.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Apply pending database migrations and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    logging::init(&config.logging)?;

    let db = Database::connect(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;
    db.migrate()
        .await
        .context("Failed to run database migrations")?;

    let command = cli.command.unwrap_or(Commands::Serve { port: None });
    match command {
        Commands::Migrate => {
            tracing::info!("migrations applied");
            Ok(())
        }
        Commands::Serve { port } => {
            let chat = Arc::new(
                OpenAiChatClient::new(config.chat_api.clone())
                    .context("Failed to build chat client")?,
            );
            let embedding_provider = Arc::new(
                OpenAiEmbeddingProvider::new(config.embedding_api.clone())
                    .context("Failed to build embedding provider")?,
            );

            let documents = Arc::new(SqliteDocumentRepository::new(db.pool().clone()));
            let chunks = Arc::new(SqliteChunkRepository::new(db.pool().clone()).await);

            let embedder = Arc::new(Embedder::new(embedding_provider));
            let summarizer = Arc::new(Summarizer::new(
                chat.clone(),
                config.summary.max_tokens,
                config.summary.concurrency,
            ));
            let transformer = Arc::new(QueryTransformer::new(chat.clone()));
            let reranker = Arc::new(Reranker::new(chat));

            let ingestion = Arc::new(IngestionService::new(
                documents.clone(),
                chunks.clone(),
                summarizer,
                embedder.clone(),
                config.chunk_strategies.clone(),
            ));
            let retriever = Arc::new(Retriever::new(
                embedder,
                chunks.clone(),
                transformer,
                reranker,
            ));

            let state = AppState {
                ingestion,
                retriever,
                documents,
                chunks,
                pool: db.pool().clone(),
                development: config.server.development,
            };

            serve(state, port.unwrap_or(config.server.port)).await
        }
    }
}
