//! Versioned JSON envelope shared by every persisted collection.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Current schema version of persisted collections.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt collection under {key:?}: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("schema version mismatch under {key:?}: stored v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        key: String,
        file_version: u32,
        expected_version: u32,
    },
    #[error("invalid store key {0:?}")]
    InvalidKey(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeRef<'a, T> {
    schema_version: u32,
    items: &'a [T],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    schema_version: u32,
}

#[derive(Deserialize)]
struct Envelope<T> {
    items: Vec<T>,
}

/// Serialize a collection into its stored form.
pub(crate) fn encode<T: Serialize>(items: &[T]) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec(&EnvelopeRef {
        schema_version: SCHEMA_VERSION,
        items,
    })?)
}

/// Parse a stored collection, checking its schema version first.
pub(crate) fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<Vec<T>, StoreError> {
    let header: Header = serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    if header.schema_version != SCHEMA_VERSION {
        return Err(StoreError::SchemaMismatch {
            key: key.to_string(),
            file_version: header.schema_version,
            expected_version: SCHEMA_VERSION,
        });
    }
    let envelope: Envelope<T> = serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    Ok(envelope.items)
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
