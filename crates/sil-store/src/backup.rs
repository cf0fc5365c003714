//! Point-in-time copies of the record file.
//!
//! Backups are named `db_expedientes_<timestamp>.json`. A restore first saves
//! the current file as `db_expedientes_pre-restore_<timestamp>.json`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use sil_core::Expediente;
use tracing::info;

use crate::StoreError;
use crate::json::{read_array, write_atomic};

pub const BACKUP_PREFIX: &str = "db_expedientes_";
const PRE_RESTORE_PREFIX: &str = "db_expedientes_pre-restore_";

/// How many backups a listing returns.
pub const MAX_LISTED: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub name: String,
    pub path: PathBuf,
    pub records: usize,
}

#[derive(Debug, Clone)]
pub struct Backups {
    dir: PathBuf,
}

impl Backups {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy the current record set into a new timestamped backup.
    pub fn create(&self, data_file: &Path) -> Result<BackupInfo, StoreError> {
        let records: Vec<Expediente> = read_array(data_file)?;
        let name = format!("{BACKUP_PREFIX}{}.json", timestamp());
        let info = self.write(&name, &records)?;
        info!(file = %info.name, records = info.records, "backup created");
        Ok(info)
    }

    /// Newest first by timestamp, safety copies included, at most [`MAX_LISTED`].
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(BACKUP_PREFIX) && name.ends_with(".json") {
                names.push(name);
            }
        }
        names.sort_unstable_by(|a, b| sort_key(b).cmp(&sort_key(a)));
        names.truncate(MAX_LISTED);
        Ok(names)
    }

    /// Replace the record file with a backup. Returns the safety copy taken first.
    pub fn restore(&self, name: &str, data_file: &Path) -> Result<BackupInfo, StoreError> {
        validate_name(name)?;
        let source = self.dir.join(name);
        if !source.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        // Refuse to restore something that would not load afterwards.
        let restored: Vec<Expediente> = read_array(&source)?;

        let current: Vec<Expediente> = read_array(data_file)?;
        let safety = self.write(&format!("{PRE_RESTORE_PREFIX}{}.json", timestamp()), &current)?;

        write_atomic(data_file, &restored)?;
        info!(file = name, records = restored.len(), previous = %safety.name, "restored backup");
        Ok(safety)
    }

    fn write(&self, name: &str, records: &[Expediente]) -> Result<BackupInfo, StoreError> {
        let path = self.dir.join(name);
        write_atomic(&path, records)?;
        Ok(BackupInfo {
            name: name.to_string(),
            path,
            records: records.len(),
        })
    }
}

/// Timestamp part of a backup name, then the name itself for ties.
fn sort_key(name: &str) -> (&str, &str) {
    let stamp = name
        .strip_prefix(PRE_RESTORE_PREFIX)
        .or_else(|| name.strip_prefix(BACKUP_PREFIX))
        .unwrap_or(name);
    (stamp, name)
}

/// UTC, filesystem-safe, lexically sortable.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    let plain = !name.is_empty()
        && !name.contains(['/', '\\'])
        && name != "."
        && name != ".."
        && Path::new(name).file_name().is_some_and(|f| f == name);
    if plain {
        Ok(())
    } else {
        Err(StoreError::Invalid(format!("backup name must be a plain file name: {name:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonStore;
    use chrono::NaiveDate;
    use sil_core::{PartialRecord, RecordStore, merge};

    fn record(identifier: &str) -> Expediente {
        let day = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        merge(None, PartialRecord::new(identifier, day))
    }

    #[test]
    fn create_list_restore() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("db_expedientes.json"));
        let backups = Backups::new(dir.path().join("backups"));

        store.save(&[record("1-D-2025")]).unwrap();
        let first = backups.create(store.path()).unwrap();
        assert!(first.name.starts_with(BACKUP_PREFIX));
        assert_eq!(first.records, 1);

        store.save(&[record("1-D-2025"), record("2-D-2025")]).unwrap();
        let safety = backups.restore(&first.name, store.path()).unwrap();
        assert!(safety.name.starts_with(PRE_RESTORE_PREFIX));
        assert_eq!(safety.records, 2);
        assert_eq!(store.load().unwrap(), vec![record("1-D-2025")]);

        let listed = backups.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(&first.name));
        assert!(listed.contains(&safety.name));
    }

    #[test]
    fn listing_is_newest_first_and_capped() {
        let dir = tempfile::tempdir().unwrap();
        for day in 1..=25 {
            let name = format!("{BACKUP_PREFIX}2025-01-{day:02}T00-00-00-000Z.json");
            fs::write(dir.path().join(name), "[]").unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let listed = Backups::new(dir.path()).list().unwrap();
        assert_eq!(listed.len(), MAX_LISTED);
        assert_eq!(listed[0], format!("{BACKUP_PREFIX}2025-01-25T00-00-00-000Z.json"));
    }

    #[test]
    fn safety_copies_sort_by_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let names = [
            format!("{PRE_RESTORE_PREFIX}2025-01-01T00-00-00-000Z.json"),
            format!("{BACKUP_PREFIX}2025-03-01T00-00-00-000Z.json"),
            format!("{BACKUP_PREFIX}2025-02-01T00-00-00-000Z.json"),
            format!("{PRE_RESTORE_PREFIX}2025-02-15T00-00-00-000Z.json"),
        ];
        for name in &names {
            fs::write(dir.path().join(name), "[]").unwrap();
        }

        let listed = Backups::new(dir.path()).list().unwrap();
        assert_eq!(listed, vec![
            names[1].clone(),
            names[3].clone(),
            names[2].clone(),
            names[0].clone(),
        ]);
    }

    #[test]
    fn missing_dir_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Backups::new(dir.path().join("none")).list().unwrap().is_empty());
    }

    #[test]
    fn restore_rejects_paths() {
        let dir = tempfile::tempdir().unwrap();
        let backups = Backups::new(dir.path());
        let data = dir.path().join("db_expedientes.json");
        for bad in ["../db_expedientes.json", "a/b.json", "..", "", "a\\b.json"] {
            assert!(matches!(backups.restore(bad, &data), Err(StoreError::Invalid(_))), "{bad}");
        }
        assert!(matches!(
            backups.restore("db_expedientes_nope.json", &data),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn restore_refuses_malformed_backup() {
        let dir = tempfile::tempdir().unwrap();
        let backups = Backups::new(dir.path());
        fs::write(dir.path().join("db_expedientes_bad.json"), "{oops").unwrap();
        let data = dir.path().join("db_expedientes.json");
        fs::write(&data, "[]").unwrap();
        assert!(matches!(
            backups.restore("db_expedientes_bad.json", &data),
            Err(StoreError::Json { .. })
        ));
        assert_eq!(fs::read_to_string(&data).unwrap(), "[]");
    }
}
