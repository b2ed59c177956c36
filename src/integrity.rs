//! Pre-start integrity checking.
//!
//! Runs once, before the store serves anything: first a timestamped archive
//! of the registry and the whole data directory (so whatever state exists
//! is captured before any write path runs), then a decode sweep over every
//! persisted JSON file. A store with undecodable files must not start —
//! the offending paths are reported and the caller aborts.
//!
//! Quarantine sidecars (`*.corrupt.bak`) are archived but not validated;
//! they are known-bad by definition and would otherwise block startup
//! forever.

use crate::config::VaultPaths;
use crate::error::{Result, VaultError};
use chrono::Utc;
use serde_json::Value;
use std::fs::{self, File};
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct IntegrityReport {
    /// The pre-start archive that was written.
    pub archive: PathBuf,
    /// Number of JSON files that decoded successfully.
    pub files_checked: usize,
}

/// Archive, then verify. Exclusive by contract: no concurrent requests may
/// be served while this runs.
pub fn run(paths: &VaultPaths) -> Result<IntegrityReport> {
    fs::create_dir_all(&paths.data_dir).map_err(VaultError::Io)?;
    fs::create_dir_all(&paths.backups_dir).map_err(VaultError::Io)?;

    let archive = write_prestart_archive(paths)?;

    let mut checked = 0;
    let mut bad = Vec::new();

    if paths.registry_file.exists() {
        check_json(&paths.registry_file, &mut checked, &mut bad)?;
    }
    for entry in fs::read_dir(&paths.data_dir).map_err(VaultError::Io)? {
        let path = entry.map_err(VaultError::Io)?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
            check_json(&path, &mut checked, &mut bad)?;
        }
    }

    if !bad.is_empty() {
        for path in &bad {
            warn!(path = %path.display(), "persisted file failed integrity check");
        }
        return Err(VaultError::Integrity(bad));
    }

    debug!(archive = %archive.display(), checked, "pre-start integrity check passed");
    Ok(IntegrityReport {
        archive,
        files_checked: checked,
    })
}

fn write_prestart_archive(paths: &VaultPaths) -> Result<PathBuf> {
    let filename = format!("prestart_{}.tar.gz", Utc::now().format("%Y%m%d_%H%M%S"));
    let archive = paths.backups_dir.join(filename);

    let mut entries = Vec::new();
    if paths.registry_file.exists() {
        let bytes = fs::read(&paths.registry_file).map_err(VaultError::Io)?;
        entries.push(("users.json".to_string(), bytes));
    }
    // Everything in the data dir is captured, sidecars included.
    for entry in fs::read_dir(&paths.data_dir).map_err(VaultError::Io)? {
        let path = entry.map_err(VaultError::Io)?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            let bytes = fs::read(&path).map_err(VaultError::Io)?;
            entries.push((format!("data/{}", name), bytes));
        }
    }

    let file = File::create(&archive).map_err(VaultError::Io)?;
    crate::backup::write_archive(file, &entries)?;
    Ok(archive)
}

fn check_json(path: &std::path::Path, checked: &mut usize, bad: &mut Vec<PathBuf>) -> Result<()> {
    let bytes = fs::read(path).map_err(VaultError::Io)?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(_) => *checked += 1,
        Err(_) => bad.push(path.to_path_buf()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, RegistryStore};

    fn prepare() -> (tempfile::TempDir, VaultPaths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = VaultPaths::from_root(dir.path());
        let store = DocumentStore::open(paths.data_dir.clone()).unwrap();
        store.ensure_entity("1").unwrap();
        store.ensure_entity("2").unwrap();
        RegistryStore::open(paths.registry_file.clone()).unwrap();
        (dir, paths)
    }

    #[test]
    fn clean_store_passes_and_is_archived() {
        let (_dir, paths) = prepare();
        let report = run(&paths).unwrap();
        // Two entities plus the registry.
        assert_eq!(report.files_checked, 3);
        assert!(report.archive.exists());
        assert!(report
            .archive
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("prestart_"));
    }

    #[test]
    fn undecodable_file_aborts_startup() {
        let (_dir, paths) = prepare();
        let bad_path = paths.data_dir.join("3.json");
        fs::write(&bad_path, "{ broken").unwrap();

        match run(&paths) {
            Err(VaultError::Integrity(bad)) => assert_eq!(bad, vec![bad_path.clone()]),
            other => panic!("expected integrity failure, got {:?}", other.map(|r| r.archive)),
        }
        // The archive was still written first, bad file included.
        let archives: Vec<_> = fs::read_dir(&paths.backups_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(archives.len(), 1);
    }

    #[test]
    fn quarantine_sidecars_do_not_block_startup() {
        let (_dir, paths) = prepare();
        fs::write(paths.data_dir.join("9.json.corrupt.bak"), "{ broken").unwrap();
        assert!(run(&paths).is_ok());
    }

    #[test]
    fn empty_store_passes() {
        let dir = tempfile::tempdir().unwrap();
        let paths = VaultPaths::from_root(dir.path());
        let report = run(&paths).unwrap();
        assert_eq!(report.files_checked, 0);
    }
}
