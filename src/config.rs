use crate::error::{Result, VaultError};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const DATA_DIR: &str = "data";
const BACKUPS_DIR: &str = "backups";
const REGISTRY_FILE: &str = "users.json";

/// Filesystem locations for one vault.
///
/// The registry file sits beside the data directory, not inside it, so an
/// entity named `users` can never collide with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    pub data_dir: PathBuf,
    pub backups_dir: PathBuf,
    pub registry_file: PathBuf,
}

impl VaultPaths {
    /// Standard layout under a single root: `root/data`, `root/backups`,
    /// `root/users.json`.
    pub fn from_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            data_dir: root.join(DATA_DIR),
            backups_dir: root.join(BACKUPS_DIR),
            registry_file: root.join(REGISTRY_FILE),
        }
    }

    /// Platform-appropriate default root (e.g. `~/.local/share/notevault`).
    pub fn resolve() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "notevault")
            .ok_or_else(|| VaultError::Store("Could not determine data directory".to_string()))?;
        Ok(Self::from_root(dirs.data_local_dir()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_root_builds_standard_layout() {
        let paths = VaultPaths::from_root("/tmp/vault");
        assert_eq!(paths.data_dir, PathBuf::from("/tmp/vault/data"));
        assert_eq!(paths.backups_dir, PathBuf::from("/tmp/vault/backups"));
        assert_eq!(paths.registry_file, PathBuf::from("/tmp/vault/users.json"));
    }
}
