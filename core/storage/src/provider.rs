//! Storage backend trait definition.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

use unistore_common::{Error, FileMetadata, Operation, Result};

/// Number of entries returned by a listing when no cap is given.
pub const DEFAULT_MAX_KEYS: usize = 1000;

/// Lifetime of the URL returned by remote uploads.
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(3600);

/// Byte stream type for streamed uploads.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Storage backend trait implemented by every provider.
///
/// Read, delete, metadata and signing operations check existence first and
/// fail with [`Error::NotFound`] before touching the underlying store, so the
/// not-found surface is the same whether the store speaks HTTP 404 or
/// `ENOENT`. Every failure is returned wrapped exactly once with the
/// [`Operation`] it happened in.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Get the provider name (e.g., "local", "aws").
    fn name(&self) -> &str;

    /// Check whether a key names a stored object.
    ///
    /// A missing key is `Ok(false)`, never an error. Only transport or
    /// permission failures are reported.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Store `data` under `key`.
    ///
    /// # Postconditions
    /// - The key is normalized with the content type's extension first
    /// - Returns a dereferenceable URL for the stored object
    ///
    /// # Errors
    /// - Invalid key
    /// - Network/I/O errors
    async fn upload(&self, key: &str, data: Bytes, content_type: Option<&str>) -> Result<String>;

    /// Store streamed content under `key`.
    ///
    /// Chunks are fully buffered before a single write; there is no
    /// incremental flushing.
    async fn upload_stream(
        &self,
        key: &str,
        mut stream: ByteStream,
        content_type: Option<&str>,
    ) -> Result<String> {
        let mut data = BytesMut::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| e.during(Operation::Upload))?;
            data.extend_from_slice(&chunk);
        }

        self.upload(key, data.freeze(), content_type).await
    }

    /// Download the full content of an object.
    ///
    /// # Errors
    /// - Key not found
    /// - Network/I/O errors
    async fn download(&self, key: &str) -> Result<Bytes>;

    /// Delete an object. Returns `true` on success.
    ///
    /// # Errors
    /// - Key not found
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Get metadata for an object.
    ///
    /// # Errors
    /// - Key not found
    async fn get_metadata(&self, key: &str) -> Result<FileMetadata>;

    /// List object metadata, at most `max_keys` entries
    /// ([`DEFAULT_MAX_KEYS`] when `None`), optionally under `prefix`.
    ///
    /// An empty listing is a valid result.
    async fn list_metadata(
        &self,
        max_keys: Option<usize>,
        prefix: Option<&str>,
    ) -> Result<Vec<FileMetadata>>;

    /// Create a URL granting read access for roughly `expires_in`.
    ///
    /// # Errors
    /// - Key not found
    async fn get_signed_url(&self, key: &str, expires_in: Duration) -> Result<String>;
}

/// Fail with [`Error::NotFound`] unless `key` exists in `backend`.
///
/// Only for backends whose `exists` cannot fail; an error from it would keep
/// the exists prefix instead of the caller's.
pub(crate) async fn ensure_exists<B>(backend: &B, key: &str) -> Result<()>
where
    B: StorageBackend + ?Sized,
{
    if backend.exists(key).await? {
        Ok(())
    } else {
        Err(Error::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    /// Minimal backend recording uploads, for exercising trait defaults.
    #[derive(Default)]
    struct RecordingBackend {
        objects: RwLock<HashMap<String, Bytes>>,
    }

    #[async_trait]
    impl StorageBackend for RecordingBackend {
        fn name(&self) -> &str {
            "recording"
        }

        async fn exists(&self, key: &str) -> Result<bool> {
            Ok(self.objects.read().await.contains_key(key))
        }

        async fn upload(&self, key: &str, data: Bytes, _: Option<&str>) -> Result<String> {
            self.objects.write().await.insert(key.to_string(), data);
            Ok(format!("test://{}", key))
        }

        async fn download(&self, key: &str) -> Result<Bytes> {
            ensure_exists(self, key)
                .await
                .map_err(|e| e.during(Operation::Download))?;
            Ok(self.objects.read().await[key].clone())
        }

        async fn delete(&self, key: &str) -> Result<bool> {
            Ok(self.objects.write().await.remove(key).is_some())
        }

        async fn get_metadata(&self, _: &str) -> Result<FileMetadata> {
            Err(Error::NotFound.during(Operation::GetMetadata))
        }

        async fn list_metadata(&self, _: Option<usize>, _: Option<&str>) -> Result<Vec<FileMetadata>> {
            Ok(Vec::new())
        }

        async fn get_signed_url(&self, key: &str, _: Duration) -> Result<String> {
            Ok(format!("test://{}", key))
        }
    }

    #[tokio::test]
    async fn test_upload_stream_concatenates_chunks() {
        let backend = RecordingBackend::default();
        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"Hello, ")),
            Ok(Bytes::from_static(b"stream")),
            Ok(Bytes::from_static(b"!")),
        ];

        backend
            .upload_stream("greeting", Box::pin(stream::iter(chunks)), None)
            .await
            .unwrap();

        let data = backend.download("greeting").await.unwrap();
        assert_eq!(&data[..], b"Hello, stream!");
    }

    #[tokio::test]
    async fn test_upload_stream_failure_is_wrapped() {
        let backend = RecordingBackend::default();
        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(Error::Transport("connection reset".to_string())),
        ];

        let err = backend
            .upload_stream("broken", Box::pin(stream::iter(chunks)), None)
            .await
            .unwrap_err();

        assert_eq!(err.operation(), Some(Operation::Upload));
        assert!(!backend.exists("broken").await.unwrap());
    }

    #[tokio::test]
    async fn test_ensure_exists_reports_not_found() {
        let backend = RecordingBackend::default();
        let err = backend.download("missing").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to download file: The specified key does not exist."
        );
    }
}
