//! PostgreSQL-backed metadata store.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{CommitRow, FileIndexRow, RefRow};
use crate::repos::{CommitRepo, FileIndexRepo, RefRepo};
use crate::store::{is_unique_violation, MetadataStore};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres, Row};
use std::collections::HashMap;
use time::OffsetDateTime;

const POSTGRES_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS refs (
    name        VARCHAR(255) PRIMARY KEY,
    commit_hash CHAR(64) NOT NULL,
    version     BIGINT NOT NULL DEFAULT 1,
    updated_at  TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS file_indices (
    linear_hash CHAR(64) PRIMARY KEY,
    merkle_root CHAR(64) NOT NULL,
    size_bytes  BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS commits (
    hash      CHAR(64) PRIMARY KEY,
    author    VARCHAR(100) NOT NULL,
    message   TEXT NOT NULL,
    timestamp BIGINT NOT NULL,
    tree_hash CHAR(64) NOT NULL,
    parents   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_commits_author ON commits(author);
CREATE INDEX IF NOT EXISTS idx_commits_timestamp ON commits(timestamp);
";

/// PostgreSQL-backed metadata store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Connect using a URL and run migrations.
    pub async fn connect(url: &str, max_connections: u32) -> MetadataResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }
}

#[async_trait]
impl MetadataStore for PostgresStore {
    async fn migrate(&self) -> MetadataResult<()> {
        for statement in POSTGRES_SCHEMA.split(';') {
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
impl RefRepo for PostgresStore {
    async fn get_ref(&self, name: &str) -> MetadataResult<Option<RefRow>> {
        let row = sqlx::query_as::<_, RefRow>(
            "SELECT name, commit_hash, version, updated_at FROM refs WHERE name = $1",
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
                "INSERT INTO refs (name, commit_hash, version, updated_at) VALUES ($1, $2, 1, $3)",
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
            "UPDATE refs SET commit_hash = $1, version = version + 1, updated_at = $2 \
             WHERE name = $3 AND version = $4",
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
impl FileIndexRepo for PostgresStore {
    async fn get_file_index(&self, linear_hash: &str) -> MetadataResult<Option<FileIndexRow>> {
        let row = sqlx::query_as::<_, FileIndexRow>(
            "SELECT linear_hash, merkle_root, size_bytes FROM file_indices WHERE linear_hash = $1",
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
            "INSERT INTO file_indices (linear_hash, merkle_root, size_bytes) VALUES ($1, $2, $3) \
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

        let rows = sqlx::query(
            "SELECT merkle_root, size_bytes FROM file_indices WHERE merkle_root = ANY($1)",
        )
        .bind(merkle_roots)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get::<String, _>(0), row.get::<i64, _>(1)))
            .collect())
    }
}

#[async_trait]
impl CommitRepo for PostgresStore {
    async fn index_commit(&self, commit: &CommitRow) -> MetadataResult<()> {
        sqlx::query(
            "INSERT INTO commits (hash, author, message, timestamp, tree_hash, parents) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (hash) DO NOTHING",
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
             FROM commits WHERE hash = $1",
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
             FROM commits WHERE author = $1 ORDER BY timestamp DESC LIMIT $2",
        )
        .bind(author)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

// Run with CASK_TEST_POSTGRES_URL pointing at a disposable database; the
// suite is skipped without it so CI does not require a server.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::{FileIndexRepo, RefRepo};

    async fn store() -> Option<PostgresStore> {
        let url = std::env::var("CASK_TEST_POSTGRES_URL").ok()?;
        Some(PostgresStore::connect(&url, 4).await.unwrap())
    }

    #[tokio::test]
    async fn ref_cas_over_postgres() {
        let Some(store) = store().await else {
            eprintln!("CASK_TEST_POSTGRES_URL not set; skipping");
            return;
        };

        let name = format!("test/{}", std::process::id());
        store.update_ref(&name, &"a".repeat(64), 0).await.unwrap();
        store.update_ref(&name, &"b".repeat(64), 1).await.unwrap();
        match store.update_ref(&name, &"c".repeat(64), 1).await {
            Err(MetadataError::StaleRef { .. }) => {}
            other => panic!("expected StaleRef, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn file_index_first_writer_wins_over_postgres() {
        let Some(store) = store().await else {
            eprintln!("CASK_TEST_POSTGRES_URL not set; skipping");
            return;
        };

        let lh = format!("{:064}", std::process::id());
        store.save_file_index(&lh, &"a".repeat(64), 1).await.unwrap();
        store.save_file_index(&lh, &"b".repeat(64), 2).await.unwrap();
        let row = store.get_file_index(&lh).await.unwrap().unwrap();
        assert_eq!(row.merkle_root, "a".repeat(64));
    }
}
