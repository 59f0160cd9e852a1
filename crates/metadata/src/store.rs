//! Metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{CommitRow, FileIndexRow, RefRow};
use crate::repos::{CommitRepo, FileIndexRepo, RefRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: RefRepo + FileIndexRepo + CommitRepo + Send + Sync {
    /// Create the schema if it does not exist.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// Whether a sqlx error is a unique-constraint violation. A creation
/// race on `refs.name` surfaces this way and maps to `StaleRef`.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

const SQLITE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS refs (
    name        TEXT PRIMARY KEY,
    commit_hash TEXT NOT NULL,
    version     INTEGER NOT NULL DEFAULT 1,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS file_indices (
    linear_hash TEXT PRIMARY KEY,
    merkle_root TEXT NOT NULL,
    size_bytes  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS commits (
    hash      TEXT PRIMARY KEY,
    author    TEXT NOT NULL,
    message   TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    tree_hash TEXT NOT NULL,
    parents   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_commits_author ON commits(author);
CREATE INDEX IF NOT EXISTS idx_commits_timestamp ON commits(timestamp);
";

/// SQLite-backed metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (and create if missing) a database at `path`.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MetadataError::Config(format!("cannot create db directory: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))
            .map_err(MetadataError::Database)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true)
            // Avoid transient "database is locked" errors under concurrency.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite serializes writers anyway; one connection sidesteps
            // lock contention entirely.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// In-memory database for tests.
    pub async fn in_memory() -> MetadataResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(MetadataError::Database)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        for statement in SQLITE_SCHEMA.split(';') {
            let statement = statement.trim();
            if !statement.is_empty() {
                sqlx::query(statement).execute(&self.pool).await?;
            }
        }
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RefRepo for SqliteStore {
    async fn get_ref(&self, name: &str) -> MetadataResult<Option<RefRow>> {
        let row = sqlx::query_as::<_, RefRow>(
            "SELECT name, commit_hash, version, updated_at FROM refs WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_ref(
        &self,
        name: &str,
        new_hash: &str,
        expected_old_version: i64,
    ) -> MetadataResult<()> {
        let now = OffsetDateTime::now_utc();

        if expected_old_version == 0 {
            let result = sqlx::query(
                "INSERT INTO refs (name, commit_hash, version, updated_at) VALUES (?, ?, 1, ?)",
            )
            .bind(name)
            .bind(new_hash)
            .bind(now)
            .execute(&self.pool)
            .await;

            return match result {
                Ok(_) => Ok(()),
                Err(err) if is_unique_violation(&err) => Err(MetadataError::StaleRef {
                    name: name.to_string(),
                    expected: 0,
                }),
                Err(err) => Err(err.into()),
            };
        }

        let result = sqlx::query(
            "UPDATE refs SET commit_hash = ?, version = version + 1, updated_at = ? \
             WHERE name = ? AND version = ?",
        )
        .bind(new_hash)
        .bind(now)
        .bind(name)
        .bind(expected_old_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::StaleRef {
                name: name.to_string(),
                expected: expected_old_version,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl FileIndexRepo for SqliteStore {
    async fn get_file_index(&self, linear_hash: &str) -> MetadataResult<Option<FileIndexRow>> {
        let row = sqlx::query_as::<_, FileIndexRow>(
            "SELECT linear_hash, merkle_root, size_bytes FROM file_indices WHERE linear_hash = ?",
        )
        .bind(linear_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn save_file_index(
        &self,
        linear_hash: &str,
        merkle_root: &str,
        size_bytes: i64,
    ) -> MetadataResult<()> {
        sqlx::query(
            "INSERT INTO file_indices (linear_hash, merkle_root, size_bytes) VALUES (?, ?, ?) \
             ON CONFLICT (linear_hash) DO NOTHING",
        )
        .bind(linear_hash)
        .bind(merkle_root)
        .bind(size_bytes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_sizes_by_merkle_roots(
        &self,
        merkle_roots: &[String],
    ) -> MetadataResult<HashMap<String, i64>> {
        if merkle_roots.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; merkle_roots.len()].join(", ");
        let sql = format!(
            "SELECT merkle_root, size_bytes FROM file_indices WHERE merkle_root IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql);
        for root in merkle_roots {
            query = query.bind(root);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.get::<String, _>(0), row.get::<i64, _>(1)))
            .collect())
    }
}

#[async_trait]
impl CommitRepo for SqliteStore {
    async fn index_commit(&self, commit: &CommitRow) -> MetadataResult<()> {
        sqlx::query(
            "INSERT INTO commits (hash, author, message, timestamp, tree_hash, parents) \
             VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT (hash) DO NOTHING",
        )
        .bind(&commit.hash)
        .bind(&commit.author)
        .bind(&commit.message)
        .bind(commit.timestamp)
        .bind(&commit.tree_hash)
        .bind(&commit.parents)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_commit(&self, hash: &str) -> MetadataResult<Option<CommitRow>> {
        let row = sqlx::query_as::<_, CommitRow>(
            "SELECT hash, author, message, timestamp, tree_hash, parents \
             FROM commits WHERE hash = ?",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_commits_by_author(
        &self,
        author: &str,
        limit: u32,
    ) -> MetadataResult<Vec<CommitRow>> {
        let rows = sqlx::query_as::<_, CommitRow>(
            "SELECT hash, author, message, timestamp, tree_hash, parents \
             FROM commits WHERE author = ? ORDER BY timestamp DESC LIMIT ?",
        )
        .bind(author)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
