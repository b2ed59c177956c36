//! Atomic file writes.
//!
//! The write goes to a temp file in the target's own directory, is synced
//! best-effort, and lands via a single rename. A crash before the rename
//! leaves the old file byte-for-byte intact; a crash after leaves the new
//! content fully in place. Readers never observe a torn file.

use crate::error::{Result, VaultError};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::warn;

/// Replace the content of `path` with `bytes`, atomically.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(VaultError::Io)?;
    tmp.write_all(bytes).map_err(VaultError::Io)?;

    // The rename below is what makes the write safe; fsync only narrows the
    // window in which a power loss can roll back to the previous content.
    if let Err(err) = tmp.as_file().sync_all() {
        warn!(path = %path.display(), %err, "fsync before rename failed, continuing");
    }

    tmp.persist(path).map_err(|err| VaultError::Io(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn write_creates_file_with_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        write_atomic(&path, b"{\"x\": 1}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{\"x\": 1}");
    }

    #[test]
    fn write_replaces_existing_content_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        fs::write(&path, "old old old old old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn failed_write_leaves_target_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("a.json");
        // Parent directory does not exist, so the temp file cannot be
        // created and nothing is renamed into place.
        assert!(write_atomic(&path, b"data").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn stray_temp_file_does_not_shadow_target() {
        // Simulates a crash between the temp write and the rename: the
        // leftover temp file is ignored and the original content survives.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        fs::write(&path, "original").unwrap();

        let mut tmp = NamedTempFile::new_in(dir.path()).unwrap();
        tmp.write_all(b"half-writ").unwrap();
        std::mem::forget(tmp);

        assert_eq!(fs::read_to_string(&path).unwrap(), "original");
    }
}
