//! Structural classification of untyped configuration payloads.
//!
//! The classifier looks only at which fields are present, never at a
//! caller-supplied tag, so a payload written for one provider cannot be
//! silently handed to another.

use std::fmt;

use serde_json::{Map, Value};

/// Configuration shape detected from field presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigShape {
    /// `bucket`, `region` and an access key pair.
    ObjectStore,
    /// The object store shape plus `endpoint` and `forcePathStyle`.
    S3Compatible,
    /// `connectionString` and `container`.
    ConnectionString,
    /// `bucket`, `projectId` and a key file path or embedded key.
    ProjectCredential,
    /// `basePath`.
    Local,
    /// No shape, or more than one, matched.
    Unrecognized,
}

impl fmt::Display for ConfigShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConfigShape::ObjectStore => "object store",
            ConfigShape::S3Compatible => "S3-compatible object store",
            ConfigShape::ConnectionString => "connection string",
            ConfigShape::ProjectCredential => "project credential",
            ConfigShape::Local => "local",
            ConfigShape::Unrecognized => "unrecognized",
        };
        f.write_str(text)
    }
}

/// Determine which backend a configuration payload targets.
///
/// The S3-compatible shape is checked before the generic object store shape,
/// which it extends. A payload matching two distinct shapes is ambiguous and
/// reported as [`ConfigShape::Unrecognized`], as is anything that is not a
/// JSON object.
pub fn classify(config: &Value) -> ConfigShape {
    let Some(fields) = config.as_object() else {
        return ConfigShape::Unrecognized;
    };

    let object_store = if is_s3_compatible(fields) {
        Some(ConfigShape::S3Compatible)
    } else if is_object_store(fields) {
        Some(ConfigShape::ObjectStore)
    } else {
        None
    };

    let candidates = [
        object_store,
        is_connection_string(fields).then_some(ConfigShape::ConnectionString),
        is_project_credential(fields).then_some(ConfigShape::ProjectCredential),
        is_local(fields).then_some(ConfigShape::Local),
    ];

    let mut matches = candidates.into_iter().flatten();
    match (matches.next(), matches.next()) {
        (Some(shape), None) => shape,
        _ => ConfigShape::Unrecognized,
    }
}

fn has(fields: &Map<String, Value>, name: &str) -> bool {
    fields.get(name).is_some_and(|value| !value.is_null())
}

fn has_access_keys(fields: &Map<String, Value>) -> bool {
    fields
        .get("credentials")
        .and_then(Value::as_object)
        .is_some_and(|creds| has(creds, "accessKeyId") && has(creds, "secretAccessKey"))
}

fn is_object_store(fields: &Map<String, Value>) -> bool {
    has(fields, "bucket") && has(fields, "region") && has_access_keys(fields)
}

fn is_s3_compatible(fields: &Map<String, Value>) -> bool {
    is_object_store(fields) && has(fields, "endpoint") && has(fields, "forcePathStyle")
}

fn is_connection_string(fields: &Map<String, Value>) -> bool {
    has(fields, "connectionString") && has(fields, "container")
}

fn is_project_credential(fields: &Map<String, Value>) -> bool {
    has(fields, "bucket")
        && has(fields, "projectId")
        && (has(fields, "keyFilePath") || has(fields, "serviceAccountKey"))
}

fn is_local(fields: &Map<String, Value>) -> bool {
    has(fields, "basePath")
}
