//! Database connection pool management.
//!
//! SQLite with WAL mode for better concurrency, foreign keys enabled so
//! document deletes cascade through the chunk tree, and embedded migrations.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

/// Database connection pool manager.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new connection pool.
    ///
    /// Journal mode WAL, synchronous NORMAL, foreign keys on, 5 second busy
    /// timeout. `max_connections` should be 1 for `sqlite::memory:` URLs, where
    /// each pooled connection would otherwise see a separate database.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .context("failed to create connection pool")?;

        Ok(Self { pool })
    }

    /// Apply pending migrations. Safe to call repeatedly.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to run migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool gracefully; call during shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_and_migrate() {
        let db = Database::connect("sqlite::memory:", 1)
            .await
            .expect("failed to connect");

        db.migrate().await.expect("failed to run migrations");

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' \
             AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .expect("failed to query tables");

        let names: Vec<String> = tables.into_iter().map(|t| t.0).collect();
        for expected in [
            "child_chunks",
            "chunk_embeddings",
            "chunk_strategies",
            "documents",
            "parent_chunks",
        ] {
            assert!(names.contains(&expected.to_string()), "{expected} missing");
        }

        db.close().await;
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let db = Database::connect("sqlite::memory:", 1)
            .await
            .expect("failed to connect");

        let result: (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .expect("failed to check pragma");

        assert_eq!(result.0, 1, "foreign keys should be enabled");
        db.close().await;
    }
}
