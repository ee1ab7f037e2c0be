//! Common types used throughout unistore.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type reported for keys that denote a directory-like prefix.
pub const FOLDER_TYPE: &str = "folder";

/// Metadata describing one stored object.
///
/// `url` is always populated by a successful lookup. It is a locator, not a
/// proof of existence: it may go stale once the object is deleted or the
/// signature expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// Key of the object within its backend.
    pub key: Option<String>,
    /// Size in bytes, if known.
    pub size: Option<u64>,
    /// Last modification time, if known.
    pub last_modified: Option<DateTime<Utc>>,
    /// Content type, the folder sentinel, or an extension fallback.
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    /// Signed URL for remote backends, `file://` URL for the local backend.
    pub url: String,
}

impl FileMetadata {
    /// Whether this entry denotes a folder.
    pub fn is_folder(&self) -> bool {
        self.content_type.as_deref() == Some(FOLDER_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_serialization() {
        let metadata = FileMetadata {
            key: Some("photos/skyline.jpg".to_string()),
            size: Some(383767),
            last_modified: Some(Utc::now()),
            content_type: Some("image/jpeg".to_string()),
            url: "file:///tmp/store/photos/skyline.jpg".to_string(),
        };

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["type"], "image/jpeg");
        assert!(json.get("lastModified").is_some());

        let deserialized: FileMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(deserialized, metadata);
    }

    #[test]
    fn test_folder_sentinel() {
        let metadata = FileMetadata {
            key: Some("photos/".to_string()),
            size: None,
            last_modified: None,
            content_type: Some(FOLDER_TYPE.to_string()),
            url: "file:///tmp/store/photos".to_string(),
        };
        assert!(metadata.is_folder());
    }
}
