//! CRUD surface over the record file.
//!
//! Every mutation takes the run lock, loads, changes, and saves atomically.
//! Reads go straight to the file.

use chrono::{NaiveDate, Utc};
use sil_core::merge::normalize;
use sil_core::{
    Chamber, Expediente, InternalMovement, LinkStats, OrdenDelDia, PartialRecord, Pipeline, RawRow,
    RecordStore, RunStats, dates, find_index, identifier, link_records, merge, merge_one,
    sort_records,
};
use tracing::{info, warn};

use crate::StoreError;
use crate::backup::{BackupInfo, Backups};
use crate::json::JsonStore;

/// Handler recorded on movements that do not name one.
pub const DEFAULT_HANDLER: &str = "System";

/// Fields for a manually created record. Identifier and summary are required.
#[derive(Debug, Clone, Default)]
pub struct NewRecord {
    pub identifier: String,
    pub summary: String,
    pub case_type: Option<String>,
    pub chamber: Option<Chamber>,
    pub status: Option<String>,
    pub entry_date: Option<NaiveDate>,
    pub authors: Vec<String>,
    pub blocs: Vec<String>,
    pub provinces: Vec<String>,
    pub abstract_text: Option<String>,
    pub publication: Option<String>,
    pub case_document: Option<String>,
}

/// Edits to an existing record. `id`, `identifier` and internal movements are
/// not editable. Authors are re-derived while the record has signatories.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub case_type: Option<String>,
    pub chamber: Option<Chamber>,
    pub status: Option<String>,
    pub entry_date: Option<NaiveDate>,
    pub authors: Option<Vec<String>>,
    pub blocs: Option<Vec<String>>,
    pub provinces: Option<Vec<String>>,
    pub summary: Option<String>,
    pub abstract_text: Option<String>,
    pub agenda_deputies: Option<String>,
    pub agenda_senate: Option<String>,
    pub agenda_date: Option<String>,
    pub case_document: Option<String>,
    pub agenda_document: Option<String>,
    pub publication: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewMovement {
    pub date: String,
    pub from: String,
    pub to: String,
    pub note: String,
    pub attachments: Vec<String>,
    pub handled_by: Option<String>,
}

pub struct Repository {
    store: JsonStore,
}

impl Repository {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    // ── Reads ──

    /// Every record, newest first.
    pub fn all(&self) -> Result<Vec<Expediente>, StoreError> {
        let mut records = self.store.load()?;
        sort_records(&mut records);
        Ok(records)
    }

    /// Look up by record id or identifier, in any spelling.
    pub fn get(&self, id: &str) -> Result<Expediente, StoreError> {
        let records = self.store.load()?;
        find_index(&records, id)
            .map(|i| records[i].clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    // ── Mutations ──

    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Vec<Expediente>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _lock = self.store.lock()?;
        let mut records = self.store.load()?;
        let out = f(&mut records)?;
        self.store.save(&records)?;
        Ok(out)
    }

    pub fn create(&self, new: NewRecord, today: NaiveDate) -> Result<Expediente, StoreError> {
        let key = identifier::canonicalize(&new.identifier);
        if key.is_empty() {
            return Err(StoreError::Invalid("identifier is required".into()));
        }
        if new.summary.trim().is_empty() {
            return Err(StoreError::Invalid("summary is required".into()));
        }

        self.mutate(|records| {
            if find_index(records, &key).is_some() {
                return Err(StoreError::AlreadyExists(key.clone()));
            }
            let mut partial = PartialRecord::new(key.clone(), today);
            partial.summary = new.summary.trim().to_string();
            if let Some(case_type) = new.case_type {
                partial.case_type = sil_core::extract::normalize_case_type(&case_type);
            }
            partial.chamber = new.chamber;
            partial.status = new.status;
            if let Some(date) = new.entry_date {
                partial.entry_date = date;
                partial.entry_date_inferred = false;
            }
            if !new.authors.is_empty() {
                partial.authors = new.authors;
            }
            partial.blocs = new.blocs;
            partial.provinces = new.provinces;
            partial.abstract_text = new.abstract_text;
            partial.publication = new.publication;
            partial.links.case_document = new.case_document;

            let record = merge(None, partial);
            records.push(record.clone());
            sort_records(records);
            info!(identifier = %record.identifier, "record created");
            Ok(record)
        })
    }

    pub fn update(&self, id: &str, patch: RecordPatch) -> Result<Expediente, StoreError> {
        self.mutate(|records| {
            let i = find_index(records, id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let record = &mut records[i];
            apply_patch(record, patch);
            let updated = record.clone();
            sort_records(records);
            info!(identifier = %updated.identifier, "record updated");
            Ok(updated)
        })
    }

    /// The only way a record leaves the set.
    pub fn delete(&self, id: &str) -> Result<Expediente, StoreError> {
        self.mutate(|records| {
            let i = find_index(records, id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let deleted = records.remove(i);
            info!(identifier = %deleted.identifier, "record deleted");
            Ok(deleted)
        })
    }

    pub fn add_movement(&self, id: &str, new: NewMovement) -> Result<InternalMovement, StoreError> {
        let missing: Vec<&str> = [
            ("date", &new.date),
            ("from", &new.from),
            ("to", &new.to),
            ("note", &new.note),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(StoreError::Invalid(format!("movement requires {}", missing.join(", "))));
        }

        self.mutate(|records| {
            let i = find_index(records, id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let record = &mut records[i];

            let mut millis = Utc::now().timestamp_millis();
            while record.movements.iter().any(|m| m.id == format!("mov-{millis}")) {
                millis += 1;
            }
            let date = dates::parse_date(&new.date)
                .map(dates::to_iso)
                .unwrap_or_else(|| new.date.trim().to_string());
            let movement = InternalMovement {
                id: format!("mov-{millis}"),
                date,
                from: new.from.trim().to_string(),
                to: new.to.trim().to_string(),
                note: new.note.trim().to_string(),
                attachments: new.attachments,
                handled_by: Some(
                    new.handled_by
                        .filter(|h| !h.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_HANDLER.to_string()),
                ),
            };
            record.movements.push(movement.clone());
            info!(identifier = %record.identifier, movement = %movement.id, "movement added");
            Ok(movement)
        })
    }

    /// Merge fresh data into one existing record.
    pub fn enrich(&self, id: &str, partial: PartialRecord) -> Result<Expediente, StoreError> {
        self.mutate(|records| {
            let i = find_index(records, id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let case_id = records[i].identifier.clone();
            let (merged, _) = merge_one(records, &case_id, partial);
            info!(identifier = %merged.identifier, "record enriched");
            Ok(merged)
        })
    }

    /// Run the reconciliation pipeline against the store under the lock.
    pub fn ingest(
        &self,
        pipeline: &Pipeline,
        rows: impl IntoIterator<Item = RawRow>,
    ) -> Result<RunStats, StoreError> {
        let _lock = self.store.lock()?;
        pipeline.run_with(&self.store, rows)
    }

    pub fn link_agenda(&self, orders: &[OrdenDelDia], today: NaiveDate) -> Result<LinkStats, StoreError> {
        self.mutate(|records| Ok(link_records(orders, records, today)))
    }

    // ── Backups ──

    pub fn backup(&self, backups: &Backups) -> Result<BackupInfo, StoreError> {
        backups.create(self.store.path())
    }

    pub fn restore(&self, backups: &Backups, name: &str) -> Result<BackupInfo, StoreError> {
        let _lock = self.store.lock()?;
        backups.restore(name, self.store.path())
    }
}

fn apply_patch(record: &mut Expediente, patch: RecordPatch) {
    fn set(slot: &mut String, value: Option<String>) {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            *slot = v.trim().to_string();
        }
    }
    // An explicit empty string clears optional fields.
    fn set_opt(slot: &mut Option<String>, value: Option<String>) {
        if let Some(v) = value {
            let v = v.trim();
            *slot = (!v.is_empty()).then(|| v.to_string());
        }
    }

    set(&mut record.case_type, patch.case_type.map(|t| sil_core::extract::normalize_case_type(&t)));
    // The identifier's chamber code always wins.
    if let Some(chamber) = patch.chamber {
        match identifier::chamber_of(&record.identifier) {
            Some(fixed) if fixed != chamber => {
                warn!(identifier = %record.identifier, requested = %chamber, "chamber fixed by identifier, ignoring");
            }
            _ => record.chamber = chamber,
        }
    }
    set(&mut record.status, patch.status);
    if let Some(date) = patch.entry_date {
        record.entry_date = date;
        record.entry_date_inferred = false;
    }
    if let Some(authors) = patch.authors {
        record.authors = authors;
    }
    if let Some(blocs) = patch.blocs {
        record.blocs = blocs;
    }
    if let Some(provinces) = patch.provinces {
        record.provinces = provinces;
    }
    set(&mut record.summary, patch.summary);
    set_opt(&mut record.abstract_text, patch.abstract_text);
    set_opt(&mut record.agenda_deputies, patch.agenda_deputies);
    set_opt(&mut record.agenda_senate, patch.agenda_senate);
    set_opt(&mut record.agenda_date, patch.agenda_date);
    set_opt(&mut record.links.case_document, patch.case_document);
    set_opt(&mut record.links.agenda_document, patch.agenda_document);
    set_opt(&mut record.publication, patch.publication);
    normalize(record);
}
