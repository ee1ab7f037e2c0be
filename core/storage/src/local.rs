//! Local filesystem storage backend.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::extension::{describe_type, normalize_key};
use crate::provider::{ensure_exists, StorageBackend, DEFAULT_MAX_KEYS};
use unistore_common::{Error, FileMetadata, Operation, Result, FOLDER_TYPE};

/// Suffix of the sidecar file holding an object's content type.
pub const SIDECAR_SUFFIX: &str = ".meta";

/// Suffix of temporary files written during an upload.
const PARTIAL_SUFFIX: &str = ".partial";

/// Content of a sidecar file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sidecar {
    content_type: String,
}

/// Local filesystem storage backend.
///
/// Stores each object as a file under the base directory and keeps the
/// content type supplied at upload time in a `<file>.meta` sidecar, since
/// the filesystem has nowhere to record it.
///
/// Concurrent writes to the same key are not serialized; the last rename
/// wins.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    base_path: PathBuf,
}

impl LocalBackend {
    /// Create a new local backend rooted at `base_path`.
    ///
    /// The directory does not need to exist yet; uploads create it.
    ///
    /// # Errors
    /// - Empty or whitespace-only path
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref();

        if base_path.to_string_lossy().trim().is_empty() {
            return Err(Error::Configuration(
                "Base path must be provided".to_string(),
            ));
        }

        Ok(Self {
            base_path: base_path.to_path_buf(),
        })
    }

    /// Directory objects are stored under.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Map a key onto a path below the base directory.
    ///
    /// Keys that are empty, absolute, climb with `..`, or collide with the
    /// sidecar naming scheme are rejected.
    fn to_fs_path(&self, key: &str) -> Result<PathBuf> {
        if key.trim_end_matches(['/', '\\']).ends_with(SIDECAR_SUFFIX) {
            return Err(Error::InvalidKey(format!(
                "'{}' uses the reserved {} suffix",
                key, SIDECAR_SUFFIX
            )));
        }

        let mut fs_path = self.base_path.clone();
        let mut depth = 0usize;

        for component in Path::new(key).components() {
            match component {
                Component::Normal(name) => {
                    fs_path.push(name);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(Error::InvalidKey(format!(
                        "'{}' escapes the base directory",
                        key
                    )));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(Error::InvalidKey(format!("'{}' must be relative", key)));
                }
            }
        }

        if depth == 0 {
            return Err(Error::InvalidKey("Key cannot be empty".to_string()));
        }

        Ok(fs_path)
    }

    async fn write_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<String> {
        let content_type = content_type.filter(|ct| !ct.trim().is_empty());
        let key = normalize_key(key, content_type);
        let fs_path = self.to_fs_path(&key)?;

        debug!(key = %key, "Uploading file");

        if let Some(parent) = fs_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        write_atomic(&fs_path, &data).await?;

        let sidecar = sidecar_path(&fs_path);
        match content_type {
            Some(content_type) => {
                let record = Sidecar {
                    content_type: content_type.to_string(),
                };
                let json = serde_json::to_vec(&record)
                    .map_err(|e| Error::Serialization(e.to_string()))?;
                write_atomic(&sidecar, &json).await?;
            }
            // A content type from an earlier upload no longer describes the data.
            None => remove_if_present(&sidecar).await?,
        }

        info!(key = %key, size = data.len(), "File uploaded");
        file_url(&fs_path)
    }

    async fn read_object(&self, key: &str) -> Result<Bytes> {
        ensure_exists(self, key).await?;
        let fs_path = self.to_fs_path(key)?;

        let data = fs::read(&fs_path).await?;
        debug!(key = %key, size = data.len(), "File read");
        Ok(Bytes::from(data))
    }

    async fn remove_object(&self, key: &str) -> Result<bool> {
        ensure_exists(self, key).await?;
        let fs_path = self.to_fs_path(key)?;

        fs::remove_file(&fs_path).await?;
        remove_if_present(&sidecar_path(&fs_path)).await?;

        info!(key = %key, "File deleted");
        Ok(true)
    }

    async fn read_metadata(&self, key: &str) -> Result<FileMetadata> {
        ensure_exists(self, key).await?;
        let fs_path = self.to_fs_path(key)?;

        let fs_meta = fs::metadata(&fs_path).await?;
        let content_type = match read_sidecar(&fs_path).await? {
            Some(content_type) => Some(content_type),
            None if fs_meta.is_dir() => Some(FOLDER_TYPE.to_string()),
            None => describe_type(None, key),
        };

        Ok(FileMetadata {
            key: Some(key.to_string()),
            size: fs_meta.is_file().then(|| fs_meta.len()),
            last_modified: fs_meta.modified().ok().map(DateTime::<Utc>::from),
            content_type,
            url: file_url(&fs_path)?,
        })
    }

    async fn list_entries(
        &self,
        max_keys: Option<usize>,
        prefix: Option<&str>,
    ) -> Result<Vec<FileMetadata>> {
        let prefix = prefix
            .map(|p| p.trim_end_matches(['/', '\\']))
            .filter(|p| !p.is_empty());
        let dir = match prefix {
            Some(prefix) => self.to_fs_path(prefix)?,
            None => self.base_path.clone(),
        };

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "Listing missing directory");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            match entry.file_name().into_string() {
                Ok(name) if is_listable(&name) => names.push(name),
                Ok(_) => {}
                Err(name) => warn!(name = ?name, "Skipping entry with non UTF-8 name"),
            }
        }

        names.sort();
        names.truncate(max_keys.unwrap_or(DEFAULT_MAX_KEYS));

        let keys: Vec<String> = names
            .into_iter()
            .map(|name| match prefix {
                Some(prefix) => format!("{}/{}", prefix, name),
                None => name,
            })
            .collect();

        try_join_all(keys.iter().map(|key| self.read_metadata(key))).await
    }

    async fn sign(&self, key: &str, expires_in: Duration) -> Result<String> {
        ensure_exists(self, key).await?;
        let fs_path = self.to_fs_path(key)?;

        // No access boundary exists for local files, so the TTL is not enforced.
        debug!(key = %key, ttl = expires_in.as_secs(), "Returning unsigned file URL");
        file_url(&fs_path)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let Ok(fs_path) = self.to_fs_path(key) else {
            return Ok(false);
        };
        Ok(fs::metadata(&fs_path).await.is_ok())
    }

    async fn upload(&self, key: &str, data: Bytes, content_type: Option<&str>) -> Result<String> {
        self.write_object(key, data, content_type)
            .await
            .map_err(|e| e.during(Operation::Upload))
    }

    async fn download(&self, key: &str) -> Result<Bytes> {
        self.read_object(key)
            .await
            .map_err(|e| e.during(Operation::Download))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.remove_object(key)
            .await
            .map_err(|e| e.during(Operation::Delete))
    }

    async fn get_metadata(&self, key: &str) -> Result<FileMetadata> {
        self.read_metadata(key)
            .await
            .map_err(|e| e.during(Operation::GetMetadata))
    }

    async fn list_metadata(
        &self,
        max_keys: Option<usize>,
        prefix: Option<&str>,
    ) -> Result<Vec<FileMetadata>> {
        self.list_entries(max_keys, prefix)
            .await
            .map_err(|e| e.during(Operation::List))
    }

    async fn get_signed_url(&self, key: &str, expires_in: Duration) -> Result<String> {
        self.sign(key, expires_in)
            .await
            .map_err(|e| e.during(Operation::SignUrl))
    }
}

fn sidecar_path(path: &Path) -> PathBuf {
    let mut sidecar = path.as_os_str().to_owned();
    sidecar.push(SIDECAR_SUFFIX);
    PathBuf::from(sidecar)
}

fn is_listable(name: &str) -> bool {
    let partial = name.starts_with('.') && name.ends_with(PARTIAL_SUFFIX);
    !partial && !name.ends_with(SIDECAR_SUFFIX)
}

fn file_url(path: &Path) -> Result<String> {
    let absolute = std::path::absolute(path)?;
    Url::from_file_path(&absolute).map(String::from).map_err(|()| {
        Error::InvalidKey(format!("Cannot build file URL for {}", absolute.display()))
    })
}

/// Write `data` to a temporary sibling, then rename it into place.
///
/// The temporary name has a fixed length so any name the filesystem accepts
/// for the target can be written.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let partial = path.with_file_name(format!(
        ".{}{}",
        Uuid::new_v4().simple(),
        PARTIAL_SUFFIX
    ));

    fs::write(&partial, data).await?;
    if let Err(e) = fs::rename(&partial, path).await {
        let _ = fs::remove_file(&partial).await;
        return Err(e.into());
    }
    Ok(())
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Content type recorded next to `path`, if a sidecar exists.
async fn read_sidecar(path: &Path) -> Result<Option<String>> {
    let raw = match fs::read(sidecar_path(path)).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let sidecar: Sidecar = serde_json::from_slice(&raw)
        .map_err(|e| Error::Serialization(format!("Invalid metadata sidecar: {}", e)))?;
    Ok(Some(sidecar.content_type))
}
