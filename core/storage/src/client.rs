//! Provider-agnostic storage client.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{Provider, StorageConfig};
use crate::local::LocalBackend;
use crate::provider::{ByteStream, StorageBackend};
use crate::remote::{azure, gcs, s3};
use crate::shape::classify;
use unistore_common::{Error, FileMetadata, Result};

/// Storage client bound to a single backend.
///
/// Every operation is forwarded to the backend unchanged, errors included.
pub struct StorageClient {
    provider: Provider,
    backend: Box<dyn StorageBackend>,
}

impl StorageClient {
    /// Create a client from an untyped configuration payload.
    ///
    /// # Preconditions
    /// - `config` must have the shape `provider` expects
    ///
    /// # Errors
    /// - Shape mismatch, ambiguous or empty configuration
    /// - Missing or empty required fields
    /// - Backend client construction failure
    pub fn new(provider: Provider, config: Value) -> Result<Self> {
        let detected = classify(&config);
        if detected != provider.expected_shape() {
            return Err(Error::Configuration(format!(
                "{} credentials are required. Configuration is incorrect or must be provided \
                 (detected {} configuration)",
                provider.display_name(),
                detected
            )));
        }

        Self::from_config(StorageConfig::from_value(provider, config)?)
    }

    /// Create a client from a typed configuration.
    pub fn from_config(config: StorageConfig) -> Result<Self> {
        config.validate()?;
        let provider = config.provider();

        let backend: Box<dyn StorageBackend> = match &config {
            StorageConfig::Aws(config) => Box::new(s3::build(config)?),
            StorageConfig::DigitalOcean(config) => Box::new(s3::build_compatible(config)?),
            StorageConfig::Azure(config) => Box::new(azure::build(config)?),
            StorageConfig::GCloud(config) => Box::new(gcs::build(config)?),
            StorageConfig::Local(config) => Box::new(LocalBackend::new(&config.base_path)?),
        };

        info!(provider = %provider, "Storage client created");
        Ok(Self { provider, backend })
    }

    /// Provider this client was built for.
    pub fn provider(&self) -> Provider {
        self.provider
    }
}

#[async_trait]
impl StorageBackend for StorageClient {
    fn name(&self) -> &str {
        self.backend.name()
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.backend.exists(key).await
    }

    async fn upload(&self, key: &str, data: Bytes, content_type: Option<&str>) -> Result<String> {
        debug!(provider = %self.provider, key, "upload");
        self.backend.upload(key, data, content_type).await
    }

    async fn upload_stream(
        &self,
        key: &str,
        stream: ByteStream,
        content_type: Option<&str>,
    ) -> Result<String> {
        debug!(provider = %self.provider, key, "upload_stream");
        self.backend.upload_stream(key, stream, content_type).await
    }

    async fn download(&self, key: &str) -> Result<Bytes> {
        debug!(provider = %self.provider, key, "download");
        self.backend.download(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        debug!(provider = %self.provider, key, "delete");
        self.backend.delete(key).await
    }

    async fn get_metadata(&self, key: &str) -> Result<FileMetadata> {
        self.backend.get_metadata(key).await
    }

    async fn list_metadata(
        &self,
        max_keys: Option<usize>,
        prefix: Option<&str>,
    ) -> Result<Vec<FileMetadata>> {
        self.backend.list_metadata(max_keys, prefix).await
    }

    async fn get_signed_url(&self, key: &str, expires_in: Duration) -> Result<String> {
        self.backend.get_signed_url(key, expires_in).await
    }
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("provider", &self.provider)
            .field("backend", &self.backend.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocalConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn aws_config() -> Value {
        json!({
            "bucket": "media",
            "region": "eu-central-1",
            "credentials": { "accessKeyId": "AKIA", "secretAccessKey": "secret" }
        })
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = StorageClient::new(Provider::Azure, aws_config()).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "Configuration error: Azure credentials are required. Configuration is incorrect \
             or must be provided (detected object store configuration)"
        );
    }

    #[test]
    fn test_empty_config_rejected_for_every_provider() {
        for provider in Provider::ALL {
            let err = StorageClient::new(provider, json!({})).unwrap_err();
            assert!(err.to_string().contains("detected unrecognized configuration"));
        }
    }

    #[test]
    fn test_path_style_config_is_not_plain_aws() {
        let mut config = aws_config();
        config["endpoint"] = json!("https://fra1.digitaloceanspaces.com");
        config["forcePathStyle"] = json!(true);

        let err = StorageClient::new(Provider::Aws, config.clone()).unwrap_err();
        assert!(err.to_string().contains("AWS credentials are required"));

        let client = StorageClient::new(Provider::DigitalOcean, config).unwrap();
        assert_eq!(client.provider(), Provider::DigitalOcean);
        assert_eq!(client.name(), "digitalocean");
    }

    #[test]
    fn test_empty_field_fails_validation() {
        let mut config = aws_config();
        config["region"] = json!("");
        let err = StorageClient::new(Provider::Aws, config).unwrap_err();
        assert!(err.to_string().contains("Region must be provided"));
    }

    #[test]
    fn test_aws_client_construction() {
        let client = StorageClient::new(Provider::Aws, aws_config()).unwrap();
        assert_eq!(client.provider(), Provider::Aws);
        assert_eq!(client.name(), "aws");
    }

    #[tokio::test]
    async fn test_local_client_delegates() {
        let temp_dir = TempDir::new().unwrap();
        let client = StorageClient::new(
            Provider::Local,
            json!({ "basePath": temp_dir.path() }),
        )
        .unwrap();
        assert_eq!(client.name(), "local");

        let url = client
            .upload("notes", Bytes::from_static(b"hello"), Some("text/plain"))
            .await
            .unwrap();
        assert!(url.starts_with("file://"));
        assert!(client.exists("notes.txt").await.unwrap());
        assert_eq!(client.download("notes.txt").await.unwrap(), "hello");

        let err = client.download("missing.txt").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to download file: The specified key does not exist."
        );
    }

    #[tokio::test]
    async fn test_from_typed_config() {
        let temp_dir = TempDir::new().unwrap();
        let client = StorageClient::from_config(StorageConfig::Local(LocalConfig {
            base_path: temp_dir.path().to_path_buf(),
        }))
        .unwrap();

        assert_eq!(client.provider(), Provider::Local);
        assert!(client.list_metadata(None, None).await.unwrap().is_empty());
    }
}
