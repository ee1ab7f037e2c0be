//! Unified object storage for unistore.
//!
//! This crate provides one trait-based interface over Amazon S3, S3-compatible
//! stores, Azure Blob Storage, Google Cloud Storage and the local filesystem,
//! plus a client that selects the backend from its configuration.
//!
//! # Design Principles
//! - Provider isolation: callers only see [`StorageBackend`]
//! - Async operations: All I/O operations are async
//! - Configuration is checked structurally before any client is built
//! - Unified error semantics: a missing key is the same error everywhere

pub mod client;
pub mod config;
pub mod extension;
pub mod local;
pub mod provider;
pub mod remote;
pub mod shape;


pub use client::StorageClient;
pub use config::{
    AwsConfig, AwsCredentials, AzureConfig, GcsConfig, LocalConfig, Provider,
    S3CompatibleConfig, StorageConfig,
};
pub use local::LocalBackend;
pub use provider::{ByteStream, StorageBackend, DEFAULT_MAX_KEYS, DEFAULT_SIGNED_URL_TTL};
pub use remote::RemoteBackend;
pub use shape::{classify, ConfigShape};
