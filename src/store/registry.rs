use crate::error::{Result, VaultError};
use crate::store::atomic::write_atomic;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Account metadata as the auth layer stores it. This store only persists
/// it; whether password comparison happens in plain text is the auth
/// layer's problem, not ours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Account {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, Value>,
}

/// The account registry file (`users.json`): a keyed store of exactly one
/// document, with the same atomic-write contract as entity files and its
/// own lock.
///
/// Registry mutations must go through [`Self::update`], which holds the
/// lock across the whole read-modify-write span. Injected into callers
/// rather than reached as ambient state.
pub struct RegistryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl RegistryStore {
    /// Open the registry, creating an empty one if the file is missing.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(VaultError::Io)?;
        }
        if !path.exists() {
            write_atomic(&path, b"{}\n")?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of all accounts.
    pub fn load(&self) -> Result<BTreeMap<String, Account>> {
        let _guard = self.lock.lock();
        self.load_locked()
    }

    pub fn get(&self, key: &str) -> Result<Option<Account>> {
        Ok(self.load()?.remove(key))
    }

    /// Read-modify-write the whole registry under its lock.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut BTreeMap<String, Account>) -> T,
    {
        let _guard = self.lock.lock();
        let mut accounts = self.load_locked()?;
        let out = f(&mut accounts);
        let mut encoded = serde_json::to_string_pretty(&accounts).map_err(VaultError::Serialization)?;
        encoded.push('\n');
        write_atomic(&self.path, encoded.as_bytes())?;
        Ok(out)
    }

    fn load_locked(&self) -> Result<BTreeMap<String, Account>> {
        let bytes = fs::read(&self.path).map_err(VaultError::Io)?;
        serde_json::from_slice(&bytes).map_err(VaultError::Serialization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_registry() -> (tempfile::TempDir, RegistryStore) {
        let dir = tempfile::tempdir().unwrap();
        let registry = RegistryStore::open(dir.path().join("users.json")).unwrap();
        (dir, registry)
    }

    #[test]
    fn open_seeds_empty_registry() {
        let (_dir, registry) = open_registry();
        assert!(registry.path().exists());
        assert!(registry.load().unwrap().is_empty());
    }

    #[test]
    fn update_persists_accounts() {
        let (dir, registry) = open_registry();
        registry
            .update(|accounts| {
                accounts.insert(
                    "100".to_string(),
                    Account {
                        password: "hunter2".to_string(),
                        logged_in: true,
                        settings: BTreeMap::new(),
                    },
                );
            })
            .unwrap();

        // A re-opened registry sees the same state.
        let reopened = RegistryStore::open(dir.path().join("users.json")).unwrap();
        let account = reopened.get("100").unwrap().expect("account");
        assert!(account.logged_in);
        assert_eq!(account.password, "hunter2");
        assert_eq!(reopened.get("missing").unwrap(), None);
    }

    #[test]
    fn update_returns_closure_value() {
        let (_dir, registry) = open_registry();
        let was_known = registry
            .update(|accounts| accounts.remove("nobody").is_some())
            .unwrap();
        assert!(!was_known);
    }
}
