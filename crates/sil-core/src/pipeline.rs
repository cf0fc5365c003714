//! Entry points that tie extraction, merging, dedup and ordering together.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::dedupe::{Deduplicator, MergeOutcome};
use crate::extract::{DEFAULT_CASE_TYPE, FieldExtractor, RawRow};
use crate::identifier;
use crate::merge::{create, merge_into};
use crate::record::{Chamber, Expediente, PartialRecord};
use crate::sort_key::sort_records;

/// Anything that can hold the canonical record set between runs.
///
/// Callers serialize writers; implementations need not lock.
pub trait RecordStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load(&self) -> Result<Vec<Expediente>, Self::Error>;
    fn save(&self, records: &[Expediente]) -> Result<(), Self::Error>;
}

// ── Single record ──

/// Position of the record matching `identifier`, by id or canonical identifier.
pub fn find_index(records: &[Expediente], identifier: &str) -> Option<usize> {
    let key = identifier::canonicalize(identifier);
    records
        .iter()
        .position(|r| r.id == identifier || identifier::canonicalize(&r.identifier) == key)
}

/// Merge one partial record into the set, creating the record if needed.
///
/// Returns the merged record. The set stays sorted.
pub fn merge_one(
    records: &mut Vec<Expediente>,
    identifier: &str,
    mut partial: PartialRecord,
) -> (Expediente, MergeOutcome) {
    let key = identifier::canonicalize(identifier);
    if identifier::canonicalize(&partial.identifier) != key {
        if !partial.identifier.trim().is_empty() {
            warn!(
                requested = %key,
                partial = %partial.identifier,
                "partial record names another case, using requested identifier"
            );
        }
        partial.identifier = key.clone();
    }

    match find_index(records, identifier) {
        Some(i) => {
            let before = records[i].entry_date;
            merge_into(&mut records[i], partial);
            let merged = records[i].clone();
            if merged.entry_date != before {
                sort_records(records);
            }
            (merged, MergeOutcome::Updated)
        }
        None => {
            let created = create(partial);
            records.push(created.clone());
            sort_records(records);
            (created, MergeOutcome::Created)
        }
    }
}

// ── Batch ──

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub created: usize,
    pub updated: usize,
    pub total: usize,
    pub deputies: usize,
    pub senate: usize,
    pub with_signatories: usize,
    pub with_referrals: usize,
    pub information_requests: usize,
}

impl RunStats {
    fn tally(&mut self, records: &[Expediente]) {
        self.total = records.len();
        for r in records {
            match r.chamber {
                Chamber::Deputies => self.deputies += 1,
                Chamber::Senate => self.senate += 1,
            }
            if !r.signatories.is_empty() {
                self.with_signatories += 1;
            }
            if !r.referrals.is_empty() {
                self.with_referrals += 1;
            }
            if r.case_type == DEFAULT_CASE_TYPE {
                self.information_requests += 1;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub records: Vec<Expediente>,
    pub stats: RunStats,
}

/// Batch reconciliation of tagged source rows against an existing set.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    extractor: FieldExtractor,
}

impl Pipeline {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            extractor: FieldExtractor::new(today),
        }
    }

    pub fn extractor(&self) -> &FieldExtractor {
        &self.extractor
    }

    /// Extract every row, merge in order over `existing`, sort.
    ///
    /// Rows should come lowest quality first; a row without an identifier is
    /// skipped and counted.
    pub fn run(
        &self,
        existing: Vec<Expediente>,
        rows: impl IntoIterator<Item = RawRow>,
    ) -> RunOutput {
        let mut stats = RunStats::default();
        let mut dedup = Deduplicator::with_existing(existing);

        for raw in rows {
            stats.rows_read += 1;
            match self.extractor.extract_raw(&raw) {
                Some(partial) => match dedup.push(partial) {
                    MergeOutcome::Created => stats.created += 1,
                    MergeOutcome::Updated => stats.updated += 1,
                },
                None => stats.rows_skipped += 1,
            }
        }

        let mut records = dedup.finish();
        sort_records(&mut records);
        stats.tally(&records);
        info!(
            rows = stats.rows_read,
            skipped = stats.rows_skipped,
            created = stats.created,
            updated = stats.updated,
            total = stats.total,
            "reconciliation run complete"
        );
        RunOutput { records, stats }
    }

    /// Load, run, save. Persistence failures propagate and nothing is saved.
    pub fn run_with<S: RecordStore>(
        &self,
        store: &S,
        rows: impl IntoIterator<Item = RawRow>,
    ) -> Result<RunStats, S::Error> {
        let existing = store.load()?;
        let out = self.run(existing, rows);
        store.save(&out.records)?;
        Ok(out.stats)
    }
}
