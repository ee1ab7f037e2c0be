//! Common utilities and types shared across unistore crates.
//!
//! This crate provides the error taxonomy and the metadata model every
//! storage backend reports through, so callers observe the same shapes
//! regardless of which backend served a request.

pub mod error;
pub mod types;

pub use error::{Error, Operation, Result};
pub use types::{FileMetadata, FOLDER_TYPE};
