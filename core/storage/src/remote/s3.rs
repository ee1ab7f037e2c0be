//! Amazon S3 and S3-compatible backends.

use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use tracing::debug;
use url::Url;

use super::{build_error, client_options, retry_config, RemoteBackend};
use crate::config::{AwsConfig, AwsCredentials, S3CompatibleConfig};
use unistore_common::{Error, Result};

/// Build a backend for an Amazon S3 bucket.
pub fn build(config: &AwsConfig) -> Result<RemoteBackend> {
    let store = base_builder(&config.bucket, &config.region, &config.credentials)
        .build()
        .map_err(|e| build_error("S3", e))?;

    debug!(bucket = %config.bucket, region = %config.region, "S3 client created");
    let store = Arc::new(store);
    Ok(RemoteBackend::new("aws", store.clone(), store))
}

/// Build a backend for an S3-compatible store behind a custom endpoint.
///
/// With `force_path_style` the bucket is addressed as the first path
/// segment; otherwise it is moved into the endpoint's host name.
pub fn build_compatible(config: &S3CompatibleConfig) -> Result<RemoteBackend> {
    let endpoint = if config.force_path_style {
        config.endpoint.trim_end_matches('/').to_string()
    } else {
        virtual_hosted_endpoint(&config.endpoint, &config.bucket)?
    };

    let store = base_builder(&config.bucket, &config.region, &config.credentials)
        .with_endpoint(&endpoint)
        .with_allow_http(endpoint.starts_with("http://"))
        .with_virtual_hosted_style_request(!config.force_path_style)
        .build()
        .map_err(|e| build_error("S3-compatible", e))?;

    debug!(
        bucket = %config.bucket,
        endpoint = %endpoint,
        path_style = config.force_path_style,
        "S3-compatible client created"
    );
    let store = Arc::new(store);
    Ok(RemoteBackend::new("digitalocean", store.clone(), store))
}

fn base_builder(bucket: &str, region: &str, credentials: &AwsCredentials) -> AmazonS3Builder {
    AmazonS3Builder::new()
        .with_bucket_name(bucket)
        .with_region(region)
        .with_access_key_id(&credentials.access_key_id)
        .with_secret_access_key(&credentials.secret_access_key)
        .with_client_options(client_options())
        .with_retry(retry_config())
}

/// Prepend the bucket to the endpoint host, unless it is already there.
fn virtual_hosted_endpoint(endpoint: &str, bucket: &str) -> Result<String> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| Error::Configuration(format!("Invalid endpoint '{}': {}", endpoint, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::Configuration(format!("Endpoint '{}' has no host", endpoint)))?
        .to_string();

    if !host.starts_with(&format!("{}.", bucket)) {
        url.set_host(Some(&format!("{}.{}", bucket, host)))
            .map_err(|e| Error::Configuration(format!("Invalid endpoint '{}': {}", endpoint, e)))?;
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StorageBackend;

    fn credentials() -> AwsCredentials {
        AwsCredentials {
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY".to_string(),
        }
    }

    #[test]
    fn test_build_aws() {
        let backend = build(&AwsConfig {
            bucket: "media".to_string(),
            region: "eu-central-1".to_string(),
            credentials: credentials(),
        })
        .unwrap();
        assert_eq!(backend.name(), "aws");
    }

    #[test]
    fn test_build_path_style_compatible() {
        let backend = build_compatible(&S3CompatibleConfig {
            bucket: "media".to_string(),
            region: "fra1".to_string(),
            endpoint: "https://fra1.digitaloceanspaces.com/".to_string(),
            force_path_style: true,
            credentials: credentials(),
        })
        .unwrap();
        assert_eq!(backend.name(), "digitalocean");
    }

    #[test]
    fn test_virtual_hosted_endpoint() {
        assert_eq!(
            virtual_hosted_endpoint("https://fra1.digitaloceanspaces.com", "media").unwrap(),
            "https://media.fra1.digitaloceanspaces.com"
        );
        assert_eq!(
            virtual_hosted_endpoint("https://media.fra1.digitaloceanspaces.com/", "media")
                .unwrap(),
            "https://media.fra1.digitaloceanspaces.com"
        );
        assert!(virtual_hosted_endpoint("not a url", "media").is_err());
    }
}
