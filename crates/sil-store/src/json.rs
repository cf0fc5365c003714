//! Flat JSON file stores with atomic replace.
//!
//! The record set and the agenda live in separate pretty-printed JSON arrays.
//! A missing file is a first run and reads as empty; an unreadable or
//! malformed one is an error.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use sil_core::{Expediente, OrdenDelDia, RecordStore};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::StoreError;
use crate::lock::RunLock;

pub(crate) fn read_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "no data file yet, starting empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(StoreError::io(path, e)),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(&bytes).map_err(|e| StoreError::json(path, e))
}

/// Write `value` to a temp file beside `path`, then rename over it.
pub(crate) fn write_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    serde_json::to_writer_pretty(&mut tmp, value).map_err(|e| StoreError::json(path, e))?;
    tmp.write_all(b"\n").map_err(|e| StoreError::io(path, e))?;
    tmp.as_file().sync_all().map_err(|e| StoreError::io(path, e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

// ── Case records ──

/// `db_expedientes.json`.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the single-writer lock for this store.
    pub fn lock(&self) -> Result<RunLock, StoreError> {
        RunLock::acquire(&self.path)
    }
}

impl RecordStore for JsonStore {
    type Error = StoreError;

    fn load(&self) -> Result<Vec<Expediente>, StoreError> {
        let records: Vec<Expediente> = read_array(&self.path)?;
        debug!(count = records.len(), path = %self.path.display(), "loaded records");
        Ok(records)
    }

    fn save(&self, records: &[Expediente]) -> Result<(), StoreError> {
        write_atomic(&self.path, records)?;
        info!(count = records.len(), path = %self.path.display(), "saved records");
        Ok(())
    }
}

// ── Agenda ──

/// `db_ordenes_dia.json`.
#[derive(Debug, Clone)]
pub struct AgendaStore {
    path: PathBuf,
}

impl AgendaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the single-writer lock for the agenda file.
    pub fn lock(&self) -> Result<RunLock, StoreError> {
        RunLock::acquire(&self.path)
    }

    pub fn load(&self) -> Result<Vec<OrdenDelDia>, StoreError> {
        read_array(&self.path)
    }

    pub fn save(&self, items: &[OrdenDelDia]) -> Result<(), StoreError> {
        write_atomic(&self.path, items)?;
        info!(count = items.len(), path = %self.path.display(), "saved agenda");
        Ok(())
    }
}
