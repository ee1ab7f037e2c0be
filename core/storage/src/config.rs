//! Provider identifiers and typed backend configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use unistore_common::{Error, Result};

use crate::shape::ConfigShape;

/// Storage provider a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Amazon S3.
    Aws,
    /// S3-compatible store reached through a custom endpoint.
    DigitalOcean,
    /// Azure Blob Storage.
    Azure,
    /// Google Cloud Storage.
    GCloud,
    /// Local filesystem.
    Local,
}

impl Provider {
    /// Every supported provider.
    pub const ALL: [Provider; 5] = [
        Provider::Aws,
        Provider::DigitalOcean,
        Provider::Azure,
        Provider::GCloud,
        Provider::Local,
    ];

    /// Identifier used on the command line and in configuration files.
    pub fn id(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::DigitalOcean => "digitalocean",
            Provider::Azure => "azure",
            Provider::GCloud => "gcloud",
            Provider::Local => "local",
        }
    }

    /// Human readable provider name used in error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Aws => "AWS",
            Provider::DigitalOcean => "Digital Ocean",
            Provider::Azure => "Azure",
            Provider::GCloud => "Google Cloud",
            Provider::Local => "Local",
        }
    }

    /// Configuration shape this provider is built from.
    pub fn expected_shape(&self) -> ConfigShape {
        match self {
            Provider::Aws => ConfigShape::ObjectStore,
            Provider::DigitalOcean => ConfigShape::S3Compatible,
            Provider::Azure => ConfigShape::ConnectionString,
            Provider::GCloud => ConfigShape::ProjectCredential,
            Provider::Local => ConfigShape::Local,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Provider::ALL
            .into_iter()
            .find(|provider| provider.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Configuration(format!("Unsupported provider '{}'", s)))
    }
}

/// Access key pair for S3-style stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Amazon S3 configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsConfig {
    pub bucket: String,
    pub region: String,
    pub credentials: AwsCredentials,
}

/// S3-compatible store configuration (DigitalOcean Spaces, MinIO, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3CompatibleConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: String,
    pub force_path_style: bool,
    pub credentials: AwsCredentials,
}

/// Azure Blob Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureConfig {
    pub connection_string: String,
    pub container: String,
}

/// Google Cloud Storage configuration.
///
/// Credentials come either from a service account key file or from the
/// key JSON embedded directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcsConfig {
    pub bucket: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_key: Option<String>,
}

/// Local filesystem configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalConfig {
    pub base_path: PathBuf,
}

/// Backend configuration tagged with the provider it is meant for.
///
/// The declared variant is authoritative; [`StorageConfig::validate`] checks
/// the fields that variant requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum StorageConfig {
    Aws(AwsConfig),
    DigitalOcean(S3CompatibleConfig),
    Azure(AzureConfig),
    GCloud(GcsConfig),
    Local(LocalConfig),
}

impl StorageConfig {
    /// Provider this configuration targets.
    pub fn provider(&self) -> Provider {
        match self {
            StorageConfig::Aws(_) => Provider::Aws,
            StorageConfig::DigitalOcean(_) => Provider::DigitalOcean,
            StorageConfig::Azure(_) => Provider::Azure,
            StorageConfig::GCloud(_) => Provider::GCloud,
            StorageConfig::Local(_) => Provider::Local,
        }
    }

    /// Deserialize an untagged configuration payload for `provider`.
    pub fn from_value(provider: Provider, value: serde_json::Value) -> Result<Self> {
        fn parse<T: serde::de::DeserializeOwned>(
            provider: Provider,
            value: serde_json::Value,
        ) -> Result<T> {
            serde_json::from_value(value).map_err(|e| {
                Error::Configuration(format!(
                    "Invalid {} configuration: {}",
                    provider.display_name(),
                    e
                ))
            })
        }

        Ok(match provider {
            Provider::Aws => StorageConfig::Aws(parse(provider, value)?),
            Provider::DigitalOcean => StorageConfig::DigitalOcean(parse(provider, value)?),
            Provider::Azure => StorageConfig::Azure(parse(provider, value)?),
            Provider::GCloud => StorageConfig::GCloud(parse(provider, value)?),
            Provider::Local => StorageConfig::Local(parse(provider, value)?),
        })
    }

    /// Check that every field the provider needs is present and non-empty.
    pub fn validate(&self) -> Result<()> {
        match self {
            StorageConfig::Aws(config) => {
                require(&config.bucket, "Bucket must be provided")?;
                require(&config.region, "Region must be provided")?;
                config.credentials.validate()
            }
            StorageConfig::DigitalOcean(config) => {
                require(&config.bucket, "Bucket must be provided")?;
                require(&config.region, "Region must be provided")?;
                require(&config.endpoint, "Endpoint must be provided")?;
                config.credentials.validate()
            }
            StorageConfig::Azure(config) => {
                require(&config.connection_string, "Connection string must be provided")?;
                require(&config.container, "Container parameter must be provided")
            }
            StorageConfig::GCloud(config) => {
                require(&config.bucket, "Bucket must be provided")?;
                require(&config.project_id, "Project must be provided")?;
                let has_key = [&config.key_file_path, &config.service_account_key]
                    .into_iter()
                    .flatten()
                    .any(|value| !value.trim().is_empty());
                if has_key {
                    Ok(())
                } else {
                    Err(Error::Configuration(
                        "Key File Path must be provided".to_string(),
                    ))
                }
            }
            StorageConfig::Local(config) => {
                require(&config.base_path.to_string_lossy(), "Base path must be provided")
            }
        }
    }
}

impl AwsCredentials {
    fn validate(&self) -> Result<()> {
        require(&self.access_key_id, "Credentials must be provided")?;
        require(&self.secret_access_key, "Credentials must be provided")
    }
}

fn require(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::Configuration(message.to_string()))
    } else {
        Ok(())
    }
}
