//! S3-compatible backend using the AWS SDK.
//!
//! Keys follow the same `aa/bbcc…` shard layout as the disk backend so a
//! bucket and a local object directory are interchangeable repositories.

use crate::error::{StorageError, StorageResult};
use crate::traits::{object_key, ByteStream, ObjectStore};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use cask_core::{CasObject, Hash, HashPrefix, ObjectKind};
use futures::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::instrument;

/// S3-compatible object store.
pub struct S3Backend {
    client: Client,
    bucket: String,
}

impl S3Backend {
    /// Build a backend for `bucket`.
    ///
    /// Explicit credentials take precedence; otherwise the ambient AWS
    /// credential chain is used. A custom `endpoint` (MinIO etc.) implies
    /// path-style addressing, which is also what the shard-key layout
    /// assumes.
    pub async fn new(
        bucket: &str,
        endpoint: Option<String>,
        region: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
    ) -> StorageResult<Self> {
        if bucket.is_empty() {
            return Err(StorageError::Config("s3 bucket must not be empty".into()));
        }

        let region = aws_config::Region::new(region.unwrap_or_else(|| "us-east-1".to_string()));
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
        if let (Some(key), Some(secret)) = (access_key_id, secret_access_key) {
            loader = loader.credentials_provider(aws_credential_types::Credentials::new(
                key, secret, None, None, "cask-config",
            ));
        }
        let shared = loader.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&shared);
        s3_config_builder.set_endpoint_url(endpoint);
        let client = Client::from_conf(s3_config_builder.force_path_style(true).build());

        Ok(Self {
            client,
            bucket: bucket.to_string(),
        })
    }

    /// Whether an SDK error means "no such object".
    ///
    /// Matches the typed service errors and, for S3-compatible services
    /// that only speak status codes, a generic 404.
    fn is_not_found<E>(err: &aws_sdk_s3::error::SdkError<E>) -> bool
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        if let aws_sdk_s3::error::SdkError::ServiceError(service_err) = err {
            if service_err.raw().status().as_u16() == 404 {
                return true;
            }
        }
        let text = err.to_string();
        text.contains("NoSuchKey") || text.contains("NotFound") || text.contains("404")
    }

    fn wrap<E>(err: aws_sdk_s3::error::SdkError<E>) -> StorageError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StorageError::S3(Box::new(err))
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    #[instrument(skip_all, fields(backend = "s3", hash = %obj.id()))]
    async fn put(&self, obj: &(dyn CasObject + Send + Sync)) -> StorageResult<()> {
        // Head is cheaper than a redundant upload; the store stays
        // correct either way because content is keyed by its own hash.
        if self.has(obj.id()).await? {
            return Ok(());
        }

        let content_type = match obj.kind() {
            ObjectKind::Chunk => "application/octet-stream",
            _ => "application/cbor",
        };

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(object_key(obj.id()))
            .content_type(content_type)
            .body(aws_sdk_s3::primitives::ByteStream::from(
                obj.encoded().to_vec(),
            ))
            .send()
            .await
            .map_err(Self::wrap)?;
        Ok(())
    }

    #[instrument(skip_all, fields(backend = "s3", hash = %hash))]
    async fn get(&self, hash: &Hash) -> StorageResult<ByteStream> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(object_key(hash))
            .send()
            .await
            .map_err(|e| {
                if Self::is_not_found(&e) {
                    StorageError::NotFound(hash.to_hex())
                } else {
                    Self::wrap(e)
                }
            })?;

        let reader = output.body.into_async_read();
        let stream = ReaderStream::new(reader).map(|result| result.map_err(StorageError::Io));
        Ok(Box::pin(stream))
    }

    #[instrument(skip_all, fields(backend = "s3", hash = %hash))]
    async fn has(&self, hash: &Hash) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(object_key(hash))
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if Self::is_not_found(&e) => Ok(false),
            Err(e) => Err(Self::wrap(e)),
        }
    }

    #[instrument(skip_all, fields(backend = "s3", prefix = %prefix))]
    async fn expand_prefix(&self, prefix: &HashPrefix) -> StorageResult<Hash> {
        // "a8fd" -> "a8/fd"; two keys are enough to distinguish
        // none / unique / ambiguous.
        let key_prefix = format!("{}/{}", prefix.shard(), prefix.rest());
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(key_prefix)
            .max_keys(2)
            .send()
            .await
            .map_err(Self::wrap)?;

        let keys: Vec<String> = output
            .contents()
            .iter()
            .filter_map(|o| o.key().map(|k| k.replacen('/', "", 1)))
            .collect();

        match keys.len() {
            0 => Err(StorageError::NotFound(prefix.to_string())),
            1 => Hash::from_hex(&keys[0])
                .map_err(|e| StorageError::Corrupt(format!("bad object key {}: {e}", keys[0]))),
            _ => Err(StorageError::Ambiguous {
                prefix: prefix.to_string(),
                matches: keys,
            }),
        }
    }
}
