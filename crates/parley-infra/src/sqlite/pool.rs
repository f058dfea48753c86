//! Database pool with split reader/writer connections in WAL mode.
//!
//! SQLite allows only one writer at a time. This module provides a `DatabasePool`
//! with a multi-connection reader pool for concurrent reads and a single-connection
//! writer pool for serialized writes. Both use WAL journal mode and enforce foreign keys.

use parley_types::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Split read/write pool for SQLite with WAL mode.
///
/// - `reader`: Multi-connection pool for concurrent SELECT queries.
/// - `writer`: Single-connection pool for serialized INSERT/UPDATE.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Create a pool with default settings (8 readers, 5-second busy timeout).
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        Self::with_config(database_url, &DatabaseConfig::default()).await
    }

    /// Create a pool sized and timed from `[database]` settings.
    ///
    /// Runs migrations automatically on the writer pool before the reader
    /// pool is opened.
    pub async fn with_config(
        database_url: &str,
        config: &DatabaseConfig,
    ) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);
        let write_opts = base_opts;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(write_opts)
            .await?;

        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(config.max_readers.max(1))
            .connect_with(read_opts)
            .await?;

        tracing::debug!(max_readers = config.max_readers, "Database pool ready");
        Ok(Self { reader, writer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool_in(dir: &tempfile::TempDir, name: &str) -> DatabasePool {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join(name).display());
        DatabasePool::new(&url).await.unwrap()
    }

    #[tokio::test]
    async fn test_pool_creates_tables() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool_in(&dir, "test.db").await;

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(&pool.reader)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(
            table_names,
            vec![
                "chat_messages",
                "chat_sessions",
                "subscription_articles",
                "subscriptions",
                "user_subscriptions",
            ]
        );
    }

    #[tokio::test]
    async fn test_pool_wal_mode() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool_in(&dir, "test_wal.db").await;

        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool.writer)
            .await
            .unwrap();

        assert_eq!(result.0.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_pool_foreign_keys_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool_in(&dir, "test_fk.db").await;

        let result: (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool.writer)
            .await
            .unwrap();

        assert_eq!(result.0, 1, "foreign keys should be enabled");
    }

    #[tokio::test]
    async fn test_reader_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool_in(&dir, "test_ro.db").await;

        let result = sqlx::query("DELETE FROM chat_sessions")
            .execute(&pool.reader)
            .await;
        assert!(result.is_err(), "reader pool must be read-only");
    }

    #[tokio::test]
    async fn test_with_config_limits_readers() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("sized.db").display());
        let config = DatabaseConfig {
            max_readers: 0,
            ..DatabaseConfig::default()
        };
        let pool = DatabasePool::with_config(&url, &config).await.unwrap();
        assert_eq!(pool.reader.options().get_max_connections(), 1);
    }

    #[tokio::test]
    async fn test_pool_reopens_existing_database() {
        let dir = tempfile::tempdir().unwrap();
        drop(pool_in(&dir, "reopen.db").await);
        // Migrations are recorded, so a second open must not fail.
        let pool = pool_in(&dir, "reopen.db").await;
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_sessions")
            .fetch_one(&pool.reader)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }
}
