//! Row encoding and store metadata models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto;
use crate::error::{EngineError, EngineResult};
use crate::record::RecordType;

/// Store metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreProperties {
    /// Random identifier assigned when the store was created
    pub store_id: String,
    /// Schema version of the stored data
    pub schema_version: u64,
    /// Last time the metadata changed (creation or migration)
    pub update_timestamp: Option<DateTime<Utc>>,
}

/// A record ready to be written: identity plus encrypted payload
#[derive(Debug, Clone)]
pub struct EncodedRow {
    pub primary_key: Option<String>,
    pub digest: String,
    pub payload: Vec<u8>,
}

impl EncodedRow {
    /// Encode the JSON form of a record with the store key
    pub fn encode(record_type: &RecordType, value: &Value, key: &[u8]) -> EngineResult<Self> {
        let plaintext = serde_json::to_vec(value)?;
        let payload = crypto::encrypt(&plaintext, key).map_err(EngineError::Encryption)?;

        Ok(Self {
            primary_key: primary_key_of(record_type, value)?,
            digest: crypto::md5_hex(&plaintext),
            payload,
        })
    }
}

/// How a stored row is found again
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKey {
    /// Declared primary key, as text
    Primary(String),
    /// MD5 of the canonical JSON form
    Digest(String),
}

impl RowKey {
    /// Identity of a record in its JSON form
    pub fn of(record_type: &RecordType, value: &Value) -> EngineResult<Self> {
        match primary_key_of(record_type, value)? {
            Some(key) => Ok(RowKey::Primary(key)),
            None => Ok(RowKey::Digest(crypto::md5_hex(serde_json::to_vec(value)?))),
        }
    }
}

/// Text form of a primary key value
///
/// Strings are stored as-is, every other JSON value by its JSON text, so
/// `10` and `"10"` are distinct keys.
pub fn primary_key_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn primary_key_of(record_type: &RecordType, value: &Value) -> EngineResult<Option<String>> {
    let Some(field) = record_type.primary_key() else {
        return Ok(None);
    };

    match value.get(field) {
        Some(Value::Null) | None => Err(EngineError::InvalidProperty(format!(
            "{}.{} (primary key) is missing",
            record_type.name(),
            field
        ))),
        Some(key) => Ok(Some(primary_key_text(key))),
    }
}

/// Decrypt and parse a stored payload
pub fn decode_payload(payload: &[u8], key: &[u8]) -> EngineResult<Value> {
    let plaintext = crypto::decrypt(payload, key).map_err(EngineError::Encryption)?;
    Ok(serde_json::from_slice(&plaintext)?)
}
