//! Relational metadata index for cask.
//!
//! The control-plane data model next to the content-addressed store:
//! - Branch pointers (`refs`) with optimistic-concurrency updates
//! - The `linear_hash -> merkle_root` fast-path index (`file_indices`)
//! - A relational projection of commits for log queries
//!
//! Backed by SQLite (embedded) or PostgreSQL, selected by configuration.

pub mod error;
pub mod manager;
pub mod models;
pub mod postgres;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use manager::{RefManager, HEAD};
pub use models::{CommitRow, FileIndexRow, RefRow};
pub use postgres::PostgresStore;
pub use repos::{CommitRepo, FileIndexRepo, RefRepo};
pub use store::{MetadataStore, SqliteStore};

use cask_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
        MetadataConfig::Postgres {
            url,
            max_connections,
        } => {
            let store = PostgresStore::connect(url, *max_connections).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_config_sqlite() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("meta.db");
        let config = MetadataConfig::Sqlite { path: path.clone() };

        let store = from_config(&config).await.unwrap();
        store.health_check().await.unwrap();
        assert!(path.exists());
    }
}
