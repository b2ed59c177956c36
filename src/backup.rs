//! Backups and restore.
//!
//! Per-entity snapshots hand back the raw encoded file so a user can
//! download exactly what the store holds. Full exports bundle every entity
//! file plus the account registry into a `tar.gz`. Restore accepts a
//! previously downloaded (possibly hand-edited or ancient) payload,
//! validates it, and replaces the entity's record wholesale through the
//! same atomic write path — a rejected payload leaves the existing file
//! byte-for-byte untouched.

use crate::codec;
use crate::error::{Result, VaultError};
use crate::migrate;
use crate::model::Record;
use crate::store::{DocumentStore, RegistryStore};
use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

pub struct BackupManager<'a> {
    store: &'a DocumentStore,
    registry: &'a RegistryStore,
    backups_dir: PathBuf,
}

impl<'a> BackupManager<'a> {
    pub fn new(store: &'a DocumentStore, registry: &'a RegistryStore, backups_dir: PathBuf) -> Self {
        Self {
            store,
            registry,
            backups_dir,
        }
    }

    /// Raw encoded record for `key`, exactly as persisted.
    pub fn snapshot_entity(&self, key: &str) -> Result<Vec<u8>> {
        self.store.ensure_entity(key)?;
        fs::read(self.store.entity_path(key)?).map_err(VaultError::Io)
    }

    /// Archive every entity file plus the registry into
    /// `backups/export_<ts>.tar.gz`. Returns the archive path.
    pub fn snapshot_all(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.backups_dir).map_err(VaultError::Io)?;
        let filename = format!("export_{}.tar.gz", Utc::now().format("%Y%m%d_%H%M%S"));
        let path = self.backups_dir.join(filename);

        let mut entries = Vec::new();
        if self.registry.path().exists() {
            let bytes = fs::read(self.registry.path()).map_err(VaultError::Io)?;
            entries.push(("users.json".to_string(), bytes));
        }
        for key in self.store.entity_keys()? {
            let file = self.store.entity_path(&key)?;
            let bytes = fs::read(&file).map_err(VaultError::Io)?;
            entries.push((format!("data/{}.json", key), bytes));
        }

        let file = File::create(&path).map_err(VaultError::Io)?;
        write_archive(file, &entries)?;
        debug!(archive = %path.display(), entries = entries.len(), "full export written");
        Ok(path)
    }

    /// Validate an uploaded payload and replace `key`'s record with it.
    ///
    /// The one hard requirement is a `sections` list; `schema_version`,
    /// `trash`, and `settings` are defaulted rather than rejected, and the
    /// payload is run through the migrator so v1-era backups restore
    /// cleanly. All-or-nothing: any failure leaves the current record as
    /// it was.
    pub fn restore_entity(&self, key: &str, bytes: &[u8]) -> Result<Record> {
        let mut value = codec::decode_value(bytes)?;
        let Some(doc) = value.as_object_mut() else {
            return Err(VaultError::Validation(
                "backup payload must be a JSON object".to_string(),
            ));
        };
        if !doc.get("sections").is_some_and(Value::is_array) {
            return Err(VaultError::Validation(
                "backup payload has no sections list".to_string(),
            ));
        }

        // Unversioned payloads are treated as v1; the migrator fills in
        // trash, settings, and per-section fields.
        if !doc.contains_key("schema_version") {
            doc.insert("schema_version".to_string(), json!(1));
        }
        migrate::migrate(doc);
        migrate::normalize_sections(doc);

        let record = codec::record_from_value(value)
            .map_err(|err| VaultError::Validation(format!("malformed section entry: {}", err)))?;
        self.store.put(key, &record)?;
        Ok(record)
    }
}

/// Write a gzip-compressed tar with the given `(name, content)` entries.
pub(crate) fn write_archive<W: Write>(writer: W, entries: &[(String, Vec<u8>)]) -> Result<()> {
    let enc = GzEncoder::new(writer, Compression::default());
    let mut tar = tar::Builder::new(enc);

    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        tar.append_data(&mut header, name, content.as_slice())
            .map_err(VaultError::Io)?;
    }

    tar.finish().map_err(VaultError::Io)?;
    Ok(())
}
