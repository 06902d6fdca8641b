// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fs;
use std::io::Write;
use std::path::Path;

/// Durably replaces `path` with `contents`.
///
/// Writes to a temp file in the same directory as `path` (so the later
/// rename stays on one filesystem), flushes and syncs it, then renames it
/// over `path`. The rename is the commit point: a crash before it leaves
/// `path` untouched, a crash after it leaves `path` fully updated. There is
/// no state in which `path` is observed partially written.
pub fn atomic_write(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Like [`atomic_write`] but also syncs the containing directory, so the
/// rename itself survives a crash on filesystems that need an explicit
/// directory fsync (ext4, xfs) to make a rename durable.
pub fn atomic_write_synced_dir(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    atomic_write(path, contents)?;
    if let Some(dir) = path.parent() {
        match fs::File::open(dir) {
            Ok(dir_file) => {
                if let Err(e) = dir_file.sync_all() {
                    log::warn!("failed to fsync directory {}: {e}", dir.display());
                }
            }
            Err(e) => log::warn!("failed to open directory {} for fsync: {e}", dir.display()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn atomic_write_replaces_existing_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("target.bin");

        atomic_write(&path, b"first").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"first");

        atomic_write(&path, b"second, and longer").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second, and longer");
    }

    #[test]
    fn atomic_write_creates_new_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("new.bin");
        assert!(!path.exists());
        atomic_write(&path, b"hello").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    fn atomic_write_synced_dir_writes_the_same_contents_as_atomic_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("target.bin");

        atomic_write_synced_dir(&path, b"first").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"first");

        atomic_write_synced_dir(&path, b"second, and longer").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second, and longer");
    }
}
