use crate::codec;
use crate::error::{Result, VaultError};
use crate::migrate;
use crate::model::Record;
use crate::store::atomic::write_atomic;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

const ENTITY_EXT: &str = "json";
const QUARANTINE_SUFFIX: &str = ".corrupt.bak";

/// What `ensure_entity` had to do to make the key servable.
#[derive(Debug, Default)]
pub struct EnsureOutcome {
    /// A fresh default record was written (new key, or replacement after
    /// quarantine).
    pub created: bool,
    /// An existing file was upgraded to the current schema version.
    pub migrated: bool,
    /// The previous file did not decode and was renamed aside to this path.
    pub quarantined: Option<PathBuf>,
}

/// Directory of per-entity record files, one `<key>.json` each.
///
/// All public operations take a per-key lock, so concurrent calls against
/// the same key are serialized while distinct keys proceed in parallel.
/// Multi-step read-modify-write sequences must go through [`Self::with_entity`],
/// which holds the key's lock across the whole span — a bare `get`/mutate/`put`
/// from two threads can still lose an update.
pub struct DocumentStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DocumentStore {
    /// Open (and create if needed) the store directory.
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(VaultError::Io)?;
        Ok(Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the backing file for `key`.
    pub fn entity_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.{}", key, ENTITY_EXT)))
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        locks.entry(key.to_string()).or_default().clone()
    }

    /// Make `key` servable: create a default record if the file is missing,
    /// migrate it if it is old, quarantine and replace it if it is corrupt.
    /// Idempotent.
    pub fn ensure_entity(&self, key: &str) -> Result<EnsureOutcome> {
        let lock = self.key_lock(key);
        let _guard = lock.lock();
        self.ensure_locked(key)
    }

    /// Current record for `key`, auto-creating/migrating on the way.
    pub fn get(&self, key: &str) -> Result<Record> {
        let lock = self.key_lock(key);
        let _guard = lock.lock();
        self.ensure_locked(key)?;
        self.read_locked(key)
    }

    /// Like `get`, but never creates: administrative lookups of keys that
    /// were never seen fail with `EntityNotFound`.
    pub fn lookup(&self, key: &str) -> Result<Record> {
        let lock = self.key_lock(key);
        let _guard = lock.lock();
        if !self.entity_path(key)?.exists() {
            return Err(VaultError::EntityNotFound(key.to_string()));
        }
        self.ensure_locked(key)?;
        self.read_locked(key)
    }

    /// Whole-record atomic replace. Last writer wins at `put` granularity.
    pub fn put(&self, key: &str, record: &Record) -> Result<()> {
        let lock = self.key_lock(key);
        let _guard = lock.lock();
        self.write_locked(key, record)
    }

    /// Run a read-modify-write cycle under the key's lock. This is the one
    /// safe shape for concurrent mutation of the same entity.
    pub fn with_entity<T, F>(&self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Record) -> Result<T>,
    {
        let lock = self.key_lock(key);
        let _guard = lock.lock();
        self.ensure_locked(key)?;
        let mut record = self.read_locked(key)?;
        let out = f(&mut record)?;
        self.write_locked(key, &record)?;
        Ok(out)
    }

    /// Remove the entity's file entirely. Irreversible, and distinct from
    /// trashing a section.
    pub fn delete_entity(&self, key: &str) -> Result<()> {
        let lock = self.key_lock(key);
        let _guard = lock.lock();
        let path = self.entity_path(key)?;
        if !path.exists() {
            return Err(VaultError::EntityNotFound(key.to_string()));
        }
        fs::remove_file(&path).map_err(VaultError::Io)?;
        // The lock table entry stays: dropping it while another thread
        // still holds the old Arc would let two cycles on a recreated key
        // run under different mutexes.
        debug!(key, "entity purged");
        Ok(())
    }

    /// Keys of every persisted entity, sorted. Quarantine sidecars and temp
    /// files are not entities and are skipped.
    pub fn entity_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(VaultError::Io)? {
            let path = entry.map_err(VaultError::Io)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTITY_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_key(stem).is_ok() {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn ensure_locked(&self, key: &str) -> Result<EnsureOutcome> {
        let path = self.entity_path(key)?;
        if !path.exists() {
            self.write_locked(key, &Record::new())?;
            return Ok(EnsureOutcome {
                created: true,
                ..Default::default()
            });
        }

        let bytes = fs::read(&path).map_err(VaultError::Io)?;
        let mut value = match codec::decode_value(&bytes) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, %err, "entity file does not parse");
                return self.quarantine_locked(key, &path);
            }
        };
        let Some(doc) = value.as_object_mut() else {
            warn!(key, "entity file is not a JSON object");
            return self.quarantine_locked(key, &path);
        };

        let migrated = migrate::migrate(doc);
        match codec::record_from_value(value) {
            Ok(record) => {
                if migrated {
                    self.write_locked(key, &record)?;
                    debug!(key, "entity migrated to current schema");
                }
                Ok(EnsureOutcome {
                    migrated,
                    ..Default::default()
                })
            }
            // Parsed as JSON but not as a record even after migration:
            // structurally corrupt by our definition.
            Err(err) => {
                warn!(key, %err, "entity file does not decode as a record");
                self.quarantine_locked(key, &path)
            }
        }
    }

    /// Preserve the bad file for forensics, then unblock the key with a
    /// fresh default record. The sidecar is never deleted by the store.
    fn quarantine_locked(&self, key: &str, path: &Path) -> Result<EnsureOutcome> {
        let bak = quarantine_path(path);
        fs::rename(path, &bak).map_err(VaultError::Io)?;
        warn!(key, quarantined = %bak.display(), "corrupt entity file set aside");
        self.write_locked(key, &Record::new())?;
        Ok(EnsureOutcome {
            created: true,
            quarantined: Some(bak),
            ..Default::default()
        })
    }

    fn read_locked(&self, key: &str) -> Result<Record> {
        let path = self.entity_path(key)?;
        let bytes = fs::read(&path).map_err(VaultError::Io)?;
        codec::decode(&bytes)
    }

    fn write_locked(&self, key: &str, record: &Record) -> Result<()> {
        let path = self.entity_path(key)?;
        write_atomic(&path, codec::encode(record)?.as_bytes())
    }
}

fn validate_key(key: &str) -> Result<()> {
    let ok = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(VaultError::Validation(format!(
            "invalid entity key: {:?}",
            key
        )))
    }
}

fn quarantine_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("entity"));
    name.push(QUARANTINE_SUFFIX);
    path.with_file_name(name)
}
