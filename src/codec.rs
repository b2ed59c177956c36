//! Record serialization.
//!
//! Records are stored as pretty-printed JSON so that backups stay
//! human-diffable. Field order comes from the struct definitions and is
//! stable across calls with equal input. Decoding here is purely
//! structural; defaulting of missing fields belongs to [`crate::migrate`].

use crate::error::{Result, VaultError};
use crate::model::Record;
use serde_json::Value;

pub fn encode(record: &Record) -> Result<String> {
    let mut out = serde_json::to_string_pretty(record).map_err(VaultError::Serialization)?;
    out.push('\n');
    Ok(out)
}

pub fn decode(bytes: &[u8]) -> Result<Record> {
    serde_json::from_slice(bytes).map_err(VaultError::Serialization)
}

/// Parse without committing to the current record shape. Used on the
/// migration path, where older files predate required fields.
pub fn decode_value(bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes).map_err(VaultError::Serialization)
}

pub fn record_from_value(value: Value) -> Result<Record> {
    serde_json::from_value(value).map_err(VaultError::Serialization)
}
