//! Azure Blob Storage backend.

use std::sync::Arc;

use object_store::azure::{AzureConfigKey, MicrosoftAzureBuilder};
use tracing::debug;

use super::{build_error, client_options, retry_config, RemoteBackend};
use crate::config::AzureConfig;
use unistore_common::{Error, Result};

/// Account settings extracted from an Azure storage connection string.
#[derive(Debug, Default, PartialEq, Eq)]
struct ConnectionString {
    account_name: Option<String>,
    account_key: Option<String>,
    shared_access_signature: Option<String>,
    blob_endpoint: Option<String>,
    protocol: Option<String>,
    endpoint_suffix: Option<String>,
    use_development_storage: bool,
}

impl ConnectionString {
    /// Parse `Key=Value;Key=Value` pairs. Unknown keys are ignored.
    fn parse(raw: &str) -> Result<Self> {
        let mut parsed = ConnectionString::default();

        for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                Error::Configuration(format!("Malformed connection string segment '{}'", pair))
            })?;
            let value = value.to_string();

            match key {
                "AccountName" => parsed.account_name = Some(value),
                "AccountKey" => parsed.account_key = Some(value),
                "SharedAccessSignature" => parsed.shared_access_signature = Some(value),
                "BlobEndpoint" => parsed.blob_endpoint = Some(value),
                "DefaultEndpointsProtocol" => parsed.protocol = Some(value),
                "EndpointSuffix" => parsed.endpoint_suffix = Some(value),
                "UseDevelopmentStorage" => {
                    parsed.use_development_storage = value.eq_ignore_ascii_case("true")
                }
                _ => debug!(key, "Ignoring connection string setting"),
            }
        }

        Ok(parsed)
    }

    /// Blob endpoint to use instead of the public Azure default, if any.
    fn endpoint(&self) -> Option<String> {
        if let Some(endpoint) = &self.blob_endpoint {
            return Some(endpoint.trim_end_matches('/').to_string());
        }

        let suffix = self.endpoint_suffix.as_deref()?;
        let account = self.account_name.as_deref()?;
        let protocol = self.protocol.as_deref().unwrap_or("https");
        Some(format!("{}://{}.blob.{}", protocol, account, suffix))
    }
}

/// Build a backend for an Azure Blob Storage container.
pub fn build(config: &AzureConfig) -> Result<RemoteBackend> {
    let store = builder(config)?
        .build()
        .map_err(|e| build_error("Azure", e))?;

    debug!(container = %config.container, "Azure client created");
    let store = Arc::new(store);
    Ok(RemoteBackend::new("azure", store.clone(), store))
}

fn builder(config: &AzureConfig) -> Result<MicrosoftAzureBuilder> {
    let connection = ConnectionString::parse(&config.connection_string)?;

    let mut builder = MicrosoftAzureBuilder::new()
        .with_container_name(&config.container)
        .with_client_options(client_options())
        .with_retry(retry_config());

    if connection.use_development_storage {
        builder = builder.with_use_emulator(true);
    } else {
        let account = connection.account_name.as_deref().ok_or_else(|| {
            Error::Configuration("Connection string must contain AccountName".to_string())
        })?;
        builder = builder.with_account(account);
    }

    if let Some(key) = &connection.account_key {
        builder = builder.with_access_key(key);
    }

    // The token is still percent-encoded; the SAS key setting decodes it.
    if let Some(sas) = &connection.shared_access_signature {
        builder = builder.with_config(AzureConfigKey::SasKey, sas.trim_start_matches('?'));
    }

    if let Some(endpoint) = connection.endpoint() {
        builder = builder
            .with_allow_http(endpoint.starts_with("http://"))
            .with_endpoint(endpoint);
    }

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StorageBackend;

    const CONNECTION: &str = "DefaultEndpointsProtocol=https;AccountName=unistore;\
                              AccountKey=c2VjcmV0LWtleQ==;EndpointSuffix=core.windows.net";

    #[test]
    fn test_parse_connection_string() {
        let parsed = ConnectionString::parse(CONNECTION).unwrap();
        assert_eq!(parsed.account_name.as_deref(), Some("unistore"));
        assert_eq!(parsed.account_key.as_deref(), Some("c2VjcmV0LWtleQ=="));
        assert_eq!(
            parsed.endpoint().as_deref(),
            Some("https://unistore.blob.core.windows.net")
        );
        assert!(!parsed.use_development_storage);
    }

    #[test]
    fn test_blob_endpoint_overrides_suffix() {
        let parsed = ConnectionString::parse(
            "AccountName=devstoreaccount1;AccountKey=a2V5;\
             BlobEndpoint=http://127.0.0.1:10000/devstoreaccount1/;EndpointSuffix=core.windows.net",
        )
        .unwrap();
        assert_eq!(
            parsed.endpoint().as_deref(),
            Some("http://127.0.0.1:10000/devstoreaccount1")
        );
    }

    #[test]
    fn test_malformed_connection_string() {
        let err = ConnectionString::parse("AccountName").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_build_requires_account_name() {
        let err = build(&AzureConfig {
            connection_string: "AccountKey=c2VjcmV0".to_string(),
            container: "media".to_string(),
        })
        .unwrap_err();
        assert!(err.to_string().contains("AccountName"));
    }

    #[test]
    fn test_build_azure() {
        let backend = build(&AzureConfig {
            connection_string: CONNECTION.to_string(),
            container: "media".to_string(),
        })
        .unwrap();
        assert_eq!(backend.name(), "azure");
    }

    #[test]
    fn test_shared_access_signature_passed_encoded() {
        let sas = "sv=2022-11-02&ss=b&srt=co&sp=rl&sig=ab%2Bcd%3D";
        let builder = builder(&AzureConfig {
            connection_string: format!(
                "AccountName=unistore;SharedAccessSignature=?{};EndpointSuffix=core.windows.net",
                sas
            ),
            container: "media".to_string(),
        })
        .unwrap();

        assert_eq!(
            builder.get_config_value(&AzureConfigKey::SasKey).as_deref(),
            Some(sas)
        );
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_build_development_storage() {
        let backend = build(&AzureConfig {
            connection_string: "UseDevelopmentStorage=true".to_string(),
            container: "media".to_string(),
        })
        .unwrap();
        assert_eq!(backend.name(), "azure");
    }
}
