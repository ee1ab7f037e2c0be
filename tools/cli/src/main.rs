//! unistore CLI - Command line interface for object storage operations.
//!
//! This tool drives any configured storage backend: uploading, downloading,
//! listing, inspecting and sharing objects.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use unistore_storage::{
    LocalConfig, Provider, StorageBackend, StorageClient, StorageConfig, DEFAULT_SIGNED_URL_TTL,
};

#[derive(Parser)]
#[command(name = "unistore")]
#[command(about = "unistore - One interface for cloud and local object storage")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Storage provider: aws, digitalocean, azure, gcloud or local.
    #[arg(short, long, global = true)]
    provider: Option<Provider>,

    /// JSON configuration file for the provider.
    #[arg(short, long, global = true, conflicts_with = "base_path")]
    config: Option<PathBuf>,

    /// Directory for the local provider (shortcut for a local config file).
    #[arg(short, long, global = true)]
    base_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file.
    Upload {
        /// Destination key.
        key: String,

        /// Source file to upload.
        file: PathBuf,

        /// Content type, used to complete the key's extension.
        #[arg(short = 't', long)]
        content_type: Option<String>,
    },

    /// Download an object.
    Download {
        /// Key to download.
        key: String,

        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete an object.
    Delete {
        /// Key to delete.
        key: String,
    },

    /// Check whether an object exists.
    Exists {
        /// Key to check.
        key: String,
    },

    /// Show object metadata.
    Info {
        /// Key to inspect.
        key: String,
    },

    /// List objects.
    List {
        /// Maximum number of entries.
        #[arg(short, long)]
        max_keys: Option<usize>,

        /// Only list keys under this prefix.
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Create a temporary read URL for an object.
    Sign {
        /// Key to share.
        key: String,

        /// Lifetime of the URL in seconds.
        #[arg(short, long, default_value_t = DEFAULT_SIGNED_URL_TTL.as_secs())]
        expires_in: u64,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "unistore", &mut std::io::stdout());
        return Ok(());
    }

    let client = build_client(
        cli.provider,
        cli.config.as_deref(),
        cli.base_path.as_deref(),
    )
    .await?;

    match cli.command {
        Commands::Upload {
            key,
            file,
            content_type,
        } => cmd_upload(&client, &key, &file, content_type.as_deref()).await,

        Commands::Download { key, output } => cmd_download(&client, &key, output.as_deref()).await,

        Commands::Delete { key } => cmd_delete(&client, &key).await,

        Commands::Exists { key } => cmd_exists(&client, &key).await,

        Commands::Info { key } => cmd_info(&client, &key).await,

        Commands::List { max_keys, prefix } => {
            cmd_list(&client, max_keys, prefix.as_deref()).await
        }

        Commands::Sign { key, expires_in } => cmd_sign(&client, &key, expires_in).await,

        Commands::Completions { .. } => Ok(()),
    }
}

/// Build a storage client from the command line options.
///
/// With `--provider` the config file is treated as that provider's payload
/// and checked structurally. Without it the file must carry its own
/// `provider` tag.
async fn build_client(
    provider: Option<Provider>,
    config: Option<&Path>,
    base_path: Option<&Path>,
) -> Result<StorageClient> {
    if let Some(base_path) = base_path {
        if provider.is_some_and(|p| p != Provider::Local) {
            anyhow::bail!("--base-path can only be used with the local provider");
        }
        return StorageClient::from_config(StorageConfig::Local(LocalConfig {
            base_path: base_path.to_path_buf(),
        }))
        .context("Failed to create local storage client");
    }

    let path = config.context("Either --config or --base-path must be provided")?;
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).context("Config file is not valid JSON")?;

    let client = match provider {
        Some(provider) => StorageClient::new(provider, value),
        None => {
            let config: StorageConfig = serde_json::from_value(value)
                .context("Config file must name its provider, or pass --provider")?;
            StorageClient::from_config(config)
        }
    }
    .context("Failed to create storage client")?;

    debug!(provider = %client.provider(), "Using storage backend");
    Ok(client)
}

/// Upload a file.
async fn cmd_upload(
    client: &StorageClient,
    key: &str,
    file: &Path,
    content_type: Option<&str>,
) -> Result<()> {
    info!("Uploading {} as {}", file.display(), key);

    let content = tokio::fs::read(file)
        .await
        .context("Failed to read source file")?;
    let size = content.len();

    let url = client
        .upload(key, content.into(), content_type)
        .await
        .context("Upload failed")?;

    println!("File uploaded successfully ({} bytes)", size);
    println!("  URL: {}", url);

    Ok(())
}

/// Download an object to a file or stdout.
async fn cmd_download(client: &StorageClient, key: &str, output: Option<&Path>) -> Result<()> {
    let content = client.download(key).await.context("Download failed")?;

    match output {
        Some(output) => {
            tokio::fs::write(output, &content)
                .await
                .context("Failed to write output file")?;
            println!(
                "File downloaded successfully: {} ({} bytes)",
                output.display(),
                content.len()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&content)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Delete an object.
async fn cmd_delete(client: &StorageClient, key: &str) -> Result<()> {
    info!("Deleting: {}", key);

    client.delete(key).await.context("Delete failed")?;
    println!("File deleted: {}", key);

    Ok(())
}

/// Report whether an object exists.
async fn cmd_exists(client: &StorageClient, key: &str) -> Result<()> {
    let exists = client.exists(key).await.context("Existence check failed")?;
    println!("{}", exists);

    Ok(())
}

/// Print object metadata as JSON.
async fn cmd_info(client: &StorageClient, key: &str) -> Result<()> {
    let metadata = client
        .get_metadata(key)
        .await
        .context("Failed to read metadata")?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);

    Ok(())
}

/// Print a listing as JSON.
async fn cmd_list(client: &StorageClient, max_keys: Option<usize>, prefix: Option<&str>) -> Result<()> {
    let entries = client
        .list_metadata(max_keys, prefix)
        .await
        .context("Listing failed")?;

    if entries.is_empty() {
        println!("No files found.");
    } else {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    }

    Ok(())
}

/// Print a temporary read URL.
async fn cmd_sign(client: &StorageClient, key: &str, expires_in: u64) -> Result<()> {
    let url = client
        .get_signed_url(key, Duration::from_secs(expires_in))
        .await
        .context("Failed to sign URL")?;
    println!("{}", url);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_global_options() {
        let cli = Cli::try_parse_from([
            "unistore",
            "list",
            "--provider",
            "local",
            "--base-path",
            "/tmp/store",
            "--max-keys",
            "10",
        ])
        .unwrap();

        assert_eq!(cli.provider, Some(Provider::Local));
        assert!(matches!(
            cli.command,
            Commands::List {
                max_keys: Some(10),
                prefix: None
            }
        ));
    }

    #[test]
    fn test_config_and_base_path_conflict() {
        let result = Cli::try_parse_from([
            "unistore",
            "--config",
            "a.json",
            "--base-path",
            "/tmp",
            "exists",
            "k",
        ]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_build_client_from_base_path() {
        let temp = TempDir::new().unwrap();
        let client = build_client(None, None, Some(temp.path())).await.unwrap();
        assert_eq!(client.provider(), Provider::Local);
    }

    #[tokio::test]
    async fn test_build_client_from_tagged_file() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("storage.json");
        let config = serde_json::json!({
            "provider": "local",
            "basePath": temp.path().join("objects"),
        });
        std::fs::write(&config_path, config.to_string()).unwrap();

        let client = build_client(None, Some(&config_path), None).await.unwrap();
        assert_eq!(client.provider(), Provider::Local);
    }

    #[tokio::test]
    async fn test_build_client_reports_shape_mismatch() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("storage.json");
        std::fs::write(&config_path, r#"{ "basePath": "/tmp/objects" }"#).unwrap();

        let err = build_client(Some(Provider::Aws), Some(&config_path), None)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("AWS credentials are required"));
    }

    #[tokio::test]
    async fn test_missing_config_source() {
        assert!(build_client(Some(Provider::Local), None, None).await.is_err());
    }
}
