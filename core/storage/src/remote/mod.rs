//! Remote object store backends.
//!
//! Wire protocols are delegated to the `object_store` clients; this module
//! only maps the storage contract onto them:
//! - existence checks before reads, deletes, metadata and signing
//! - content types carried as object attributes
//! - signed URLs produced by the client's own signer

pub mod azure;
pub mod gcs;
pub mod s3;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use http::Method;
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::{
    Attribute, Attributes, ClientOptions, GetOptions, ObjectMeta, ObjectStore, PutOptions,
    PutPayload, RetryConfig,
};
use tracing::{debug, info};

use crate::extension::{describe_type, normalize_key};
use crate::provider::{StorageBackend, DEFAULT_MAX_KEYS, DEFAULT_SIGNED_URL_TTL};
use unistore_common::{Error, FileMetadata, Operation, Result};

/// Storage backend over an `object_store` client.
///
/// The store and the signer are normally the same client seen through two
/// traits (for example one `AmazonS3` behind both `Arc`s).
pub struct RemoteBackend {
    name: &'static str,
    store: Arc<dyn ObjectStore>,
    signer: Arc<dyn Signer>,
}

impl RemoteBackend {
    /// Create a backend named `name` from a store and its signer.
    pub fn new(name: &'static str, store: Arc<dyn ObjectStore>, signer: Arc<dyn Signer>) -> Self {
        Self {
            name,
            store,
            signer,
        }
    }

    /// HEAD the key. Failures other than a missing object are returned bare
    /// so the calling operation can wrap them with its own prefix.
    async fn head_exists(&self, key: &str) -> Result<bool> {
        let Ok(location) = object_path(key) else {
            return Ok(false);
        };

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(transport(e)),
        }
    }

    async fn ensure_present(&self, key: &str) -> Result<()> {
        if self.head_exists(key).await? {
            Ok(())
        } else {
            Err(Error::NotFound)
        }
    }

    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<String> {
        let content_type = content_type.filter(|ct| !ct.trim().is_empty());
        let key = normalize_key(key, content_type);
        let location = object_path(&key)?;

        let mut attributes = Attributes::new();
        if let Some(content_type) = content_type {
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
        }
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        let size = data.len();
        self.store
            .put_opts(&location, PutPayload::from(data), options)
            .await
            .map_err(transport)?;

        info!(provider = self.name, key = %key, size, "File uploaded");
        self.signed_url(&location, DEFAULT_SIGNED_URL_TTL).await
    }

    async fn get_object(&self, key: &str) -> Result<Bytes> {
        self.ensure_present(key).await?;
        let location = object_path(key)?;

        let result = self.store.get(&location).await.map_err(transport)?;
        let data = result.bytes().await.map_err(transport)?;
        debug!(provider = self.name, key = %key, size = data.len(), "File read");
        Ok(data)
    }

    async fn delete_object(&self, key: &str) -> Result<bool> {
        self.ensure_present(key).await?;
        let location = object_path(key)?;

        self.store.delete(&location).await.map_err(transport)?;
        info!(provider = self.name, key = %key, "File deleted");
        Ok(true)
    }

    async fn head_object(&self, key: &str) -> Result<FileMetadata> {
        self.ensure_present(key).await?;
        let location = object_path(key)?;

        let options = GetOptions {
            head: true,
            ..Default::default()
        };
        let result = self
            .store
            .get_opts(&location, options)
            .await
            .map_err(transport)?;
        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|value| value.to_string());

        self.to_metadata(result.meta, content_type).await
    }

    async fn list_objects(
        &self,
        max_keys: Option<usize>,
        prefix: Option<&str>,
    ) -> Result<Vec<FileMetadata>> {
        let prefix = prefix
            .map(|p| p.trim_end_matches('/'))
            .filter(|p| !p.is_empty())
            .map(object_path)
            .transpose()?;

        let mut listing = self
            .store
            .list(prefix.as_ref())
            .take(max_keys.unwrap_or(DEFAULT_MAX_KEYS));

        let mut results = Vec::new();
        while let Some(meta) = listing.next().await {
            let meta = meta.map_err(transport)?;
            results.push(self.to_metadata(meta, None).await?);
        }

        debug!(provider = self.name, count = results.len(), "Files listed");
        Ok(results)
    }

    async fn sign(&self, key: &str, expires_in: Duration) -> Result<String> {
        self.ensure_present(key).await?;
        let location = object_path(key)?;
        self.signed_url(&location, expires_in).await
    }

    async fn signed_url(&self, location: &Path, expires_in: Duration) -> Result<String> {
        let url = self
            .signer
            .signed_url(Method::GET, location, expires_in)
            .await
            .map_err(transport)?;
        Ok(url.into())
    }

    async fn to_metadata(
        &self,
        meta: ObjectMeta,
        content_type: Option<String>,
    ) -> Result<FileMetadata> {
        let key = meta.location.to_string();
        let url = self.signed_url(&meta.location, DEFAULT_SIGNED_URL_TTL).await?;

        Ok(FileMetadata {
            content_type: describe_type(content_type, &key),
            key: Some(key),
            size: Some(meta.size as u64),
            last_modified: Some(meta.last_modified),
            url,
        })
    }
}

impl fmt::Debug for RemoteBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteBackend")
            .field("name", &self.name)
            .field("store", &self.store.to_string())
            .finish()
    }
}

#[async_trait]
impl StorageBackend for RemoteBackend {
    fn name(&self) -> &str {
        self.name
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.head_exists(key)
            .await
            .map_err(|e| e.during(Operation::Exists))
    }

    async fn upload(&self, key: &str, data: Bytes, content_type: Option<&str>) -> Result<String> {
        self.put_object(key, data, content_type)
            .await
            .map_err(|e| e.during(Operation::Upload))
    }

    async fn download(&self, key: &str) -> Result<Bytes> {
        self.get_object(key)
            .await
            .map_err(|e| e.during(Operation::Download))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.delete_object(key)
            .await
            .map_err(|e| e.during(Operation::Delete))
    }

    async fn get_metadata(&self, key: &str) -> Result<FileMetadata> {
        self.head_object(key)
            .await
            .map_err(|e| e.during(Operation::GetMetadata))
    }

    async fn list_metadata(
        &self,
        max_keys: Option<usize>,
        prefix: Option<&str>,
    ) -> Result<Vec<FileMetadata>> {
        self.list_objects(max_keys, prefix)
            .await
            .map_err(|e| e.during(Operation::List))
    }

    async fn get_signed_url(&self, key: &str, expires_in: Duration) -> Result<String> {
        self.sign(key, expires_in)
            .await
            .map_err(|e| e.during(Operation::SignUrl))
    }
}

/// Client options shared by every remote builder.
pub(crate) fn client_options() -> ClientOptions {
    ClientOptions::default()
}

/// Failures surface to the caller immediately; the client never retries.
pub(crate) fn retry_config() -> RetryConfig {
    RetryConfig {
        max_retries: 0,
        ..Default::default()
    }
}

fn object_path(key: &str) -> Result<Path> {
    Path::parse(key).map_err(|e| Error::InvalidKey(e.to_string()))
}

fn transport(err: object_store::Error) -> Error {
    match err {
        object_store::Error::NotFound { .. } => Error::NotFound,
        other => Error::Transport(other.to_string()),
    }
}

fn build_error(provider: &str, err: object_store::Error) -> Error {
    Error::Configuration(format!("Failed to create {} client: {}", provider, err))
}
