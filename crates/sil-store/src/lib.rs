//! Persistence and read-side helpers for SIL case records.

pub mod backup;
mod error;
pub mod export;
pub mod json;
pub mod lock;
pub mod query;
pub mod repo;

pub use backup::{BackupInfo, Backups};
pub use error::StoreError;
pub use export::{write_csv, write_json, write_xlsx};
pub use json::{AgendaStore, JsonStore};
pub use lock::RunLock;
pub use query::{Filter, Stats, bloc_catalog, province_catalog, search, stats};
pub use repo::{NewMovement, NewRecord, RecordPatch, Repository};
