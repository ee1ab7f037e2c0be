//! Common error types for unistore.

use std::fmt;
use thiserror::Error;

/// Storage operation an error occurred in.
///
/// Rendered into the stable `Failed to <operation>: <cause>` prefix so callers
/// can match on the failing operation without parsing backend error formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Exists,
    Upload,
    Download,
    Delete,
    GetMetadata,
    List,
    SignUrl,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Operation::Exists => "check if file exists",
            Operation::Upload => "upload file",
            Operation::Download => "download file",
            Operation::Delete => "delete file",
            Operation::GetMetadata => "get file",
            Operation::List => "list files",
            Operation::SignUrl => "generate signed URL",
        };
        f.write_str(text)
    }
}

/// Top-level error type for unistore operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration does not match the requested provider or misses a field.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The key does not name a stored object.
    #[error("The specified key does not exist.")]
    NotFound,

    /// The key cannot be mapped onto the backend's namespace.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote store or network failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A failure wrapped with the operation it happened in.
    #[error("Failed to {operation}: {source}")]
    Operation {
        operation: Operation,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with the operation it occurred in.
    ///
    /// Already wrapped errors are returned unchanged, so nested calls inside a
    /// backend never produce a doubled prefix.
    pub fn during(self, operation: Operation) -> Self {
        match self {
            Error::Operation { .. } => self,
            other => Error::Operation {
                operation,
                source: Box::new(other),
            },
        }
    }

    /// The operation this error was raised in, if it has been wrapped.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Error::Operation { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// Whether the underlying cause is a missing key.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound => true,
            Error::Operation { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Whether the underlying cause is a configuration problem.
    pub fn is_configuration(&self) -> bool {
        match self {
            Error::Configuration(_) => true,
            Error::Operation { source, .. } => source.is_configuration(),
            _ => false,
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = Error::NotFound.during(Operation::Download);
        assert_eq!(
            err.to_string(),
            "Failed to download file: The specified key does not exist."
        );
        assert!(err.is_not_found());
        assert_eq!(err.operation(), Some(Operation::Download));
    }

    #[test]
    fn test_during_does_not_double_wrap() {
        let err = Error::NotFound
            .during(Operation::GetMetadata)
            .during(Operation::List);
        assert_eq!(
            err.to_string(),
            "Failed to get file: The specified key does not exist."
        );
    }

    #[test]
    fn test_io_error_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::from(io).during(Operation::Upload);
        assert!(err.to_string().starts_with("Failed to upload file: "));
        assert!(err.to_string().contains("denied"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_operation_labels() {
        assert_eq!(Operation::SignUrl.to_string(), "generate signed URL");
        assert_eq!(Operation::List.to_string(), "list files");
        assert_eq!(Operation::Exists.to_string(), "check if file exists");
    }
}
