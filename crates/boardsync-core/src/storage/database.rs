//! Primary store connection
//!
//! One pool serves both the job tables and the outbox, so a job write and its
//! outbox event can share a transaction.

use crate::config::DatabaseSettings;
use crate::storage::migrations;
use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const MEMORY_PATH: &str = ":memory:";

/// Where the store lives and how many connections it may hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_connections: 5,
        }
    }

    /// `[database]` settings; a missing path falls back to the data dir
    pub fn from_settings(settings: &DatabaseSettings) -> Self {
        let path = settings.path.clone().unwrap_or_else(default_database_path);
        Self::with_path(path).max_connections(settings.max_connections)
    }

    /// Private in-memory store; a single connection keeps every query on it
    pub fn in_memory() -> Self {
        Self::with_path(MEMORY_PATH).max_connections(1)
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }
}

/// `<data dir>/boardsync/boardsync.db`, or the working directory when the
/// platform has no data dir
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("boardsync").join("boardsync.db"))
        .unwrap_or_else(|| PathBuf::from("boardsync.db"))
}

/// Migrated SQLite pool for jobs and outbox events
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    path: PathBuf,
}

impl Database {
    /// Open (creating if needed) and migrate the store
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        let options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            if let Some(parent) = config.path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create store directory {}", parent.display()))?;
            }
            SqliteConnectOptions::new().filename(&config.path)
        };

        // WAL lets the sync worker read while job writers commit
        let options = options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open store at {}", config.path.display()))?;

        migrations::run_migrations(&pool)
            .await
            .context("Failed to migrate the store")?;

        Ok(Self {
            pool,
            path: config.path,
        })
    }

    pub async fn in_memory() -> Result<Self> {
        Self::new(DatabaseConfig::in_memory()).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn migration_status(&self) -> Result<migrations::MigrationStatus> {
        migrations::migration_status(&self.pool)
            .await
            .context("Failed to read the store's schema version")
    }

    /// Round-trip a trivial query
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Store did not answer")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_is_migrated() {
        let db = Database::in_memory().await.expect("in-memory store");

        db.health_check().await.expect("health check");
        let status = db.migration_status().await.expect("migration status");
        assert!(!status.needs_migration);
    }

    #[test]
    fn test_config_from_settings() {
        let settings = DatabaseSettings {
            path: Some(PathBuf::from("/var/lib/boardsync/store.db")),
            max_connections: 3,
        };
        let config = DatabaseConfig::from_settings(&settings);
        assert_eq!(config, DatabaseConfig::with_path("/var/lib/boardsync/store.db").max_connections(3));
    }

    #[test]
    fn test_zero_connections_is_raised_to_one() {
        assert_eq!(DatabaseConfig::with_path("x.db").max_connections(0).max_connections, 1);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let db = Database::in_memory().await.unwrap();

        let (enabled,): (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_file_store_and_parent_dirs_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("store.db");

        let db = Database::new(DatabaseConfig::with_path(&path)).await.unwrap();
        db.health_check().await.unwrap();

        assert_eq!(db.path(), path.as_path());
        assert!(path.exists());
    }
}
