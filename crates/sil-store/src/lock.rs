//! Single-writer run lock.
//!
//! `<data file>.lock` is created exclusively and removed when the guard drops.
//! A lock left behind by a killed process has to be removed by hand.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::StoreError;

#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Lock file path for a data file.
    pub fn path_for(data_file: &Path) -> PathBuf {
        let mut name = data_file.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Take the lock for `data_file`, failing with [`StoreError::Locked`] when held.
    pub fn acquire(data_file: &Path) -> Result<Self, StoreError> {
        Self::acquire_with(data_file, |file| writeln!(file, "{}", std::process::id()))
    }

    /// The guard owns the file before `stamp` runs, so a failed stamp still
    /// removes it.
    fn acquire_with(
        data_file: &Path,
        stamp: impl FnOnce(&mut File) -> io::Result<()>,
    ) -> Result<Self, StoreError> {
        let path = Self::path_for(data_file);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(StoreError::Locked(path)),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        let lock = Self { path };
        if let Err(e) = stamp(&mut file) {
            drop(file);
            return Err(StoreError::io(&lock.path, e));
        }
        debug!(path = %lock.path.display(), "run lock acquired");
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove run lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_writer_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("db_expedientes.json");

        let lock = RunLock::acquire(&data).unwrap();
        assert!(lock.path().exists());
        assert!(matches!(RunLock::acquire(&data), Err(StoreError::Locked(_))));

        drop(lock);
        assert!(!RunLock::path_for(&data).exists());
        assert!(RunLock::acquire(&data).is_ok());
    }

    #[test]
    fn failed_stamp_leaves_no_lock_behind() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("db_expedientes.json");

        let err = RunLock::acquire_with(&data, |_| Err(io::Error::other("disk full")));
        assert!(matches!(err, Err(StoreError::Io { .. })));
        assert!(!RunLock::path_for(&data).exists());
        assert!(RunLock::acquire(&data).is_ok());
    }

    #[test]
    fn lock_sits_next_to_data_file() {
        let p = RunLock::path_for(Path::new("/srv/sil/db_expedientes.json"));
        assert_eq!(p, PathBuf::from("/srv/sil/db_expedientes.json.lock"));
    }
}
