//! Google Cloud Storage backend.

use std::path::Path;
use std::sync::Arc;

use object_store::gcp::GoogleCloudStorageBuilder;
use tracing::debug;

use super::{build_error, client_options, retry_config, RemoteBackend};
use crate::config::GcsConfig;
use unistore_common::{Error, Result};

/// Build a backend for a Google Cloud Storage bucket.
///
/// A key file path takes precedence over an embedded service account key.
/// The project id is implied by the service account.
pub fn build(config: &GcsConfig) -> Result<RemoteBackend> {
    let mut builder = GoogleCloudStorageBuilder::new()
        .with_bucket_name(&config.bucket)
        .with_client_options(client_options())
        .with_retry(retry_config());

    match (non_empty(&config.key_file_path), non_empty(&config.service_account_key)) {
        (Some(path), _) => {
            if !Path::new(path).is_file() {
                return Err(Error::Configuration(format!(
                    "Key file '{}' does not exist",
                    path
                )));
            }
            builder = builder.with_service_account_path(path);
        }
        (None, Some(key)) => builder = builder.with_service_account_key(key),
        (None, None) => {
            return Err(Error::Configuration(
                "Key File Path must be provided".to_string(),
            ))
        }
    }

    let store = builder.build().map_err(|e| build_error("Google Cloud", e))?;

    debug!(bucket = %config.bucket, project = %config.project_id, "GCS client created");
    let store = Arc::new(store);
    Ok(RemoteBackend::new("gcloud", store.clone(), store))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config(key_file_path: Option<String>, service_account_key: Option<String>) -> GcsConfig {
        GcsConfig {
            bucket: "media".to_string(),
            project_id: "unistore-test".to_string(),
            key_file_path,
            service_account_key,
        }
    }

    #[test]
    fn test_missing_key_file() {
        let err = build(&config(Some("/nonexistent/key.json".to_string()), None)).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("/nonexistent/key.json"));
    }

    #[test]
    fn test_no_key_material() {
        let err = build(&config(Some("  ".to_string()), None)).unwrap_err();
        assert!(err.to_string().contains("Key File Path must be provided"));
    }

    #[test]
    fn test_malformed_key_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();

        let path = file.path().to_string_lossy().to_string();
        let err = build(&config(Some(path), None)).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Failed to create Google Cloud client"));
    }

    #[test]
    fn test_malformed_embedded_key() {
        let err = build(&config(None, Some("{".to_string()))).unwrap_err();
        assert!(err.is_configuration());
    }
}
