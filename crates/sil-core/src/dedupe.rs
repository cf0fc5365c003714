//! Collapse candidate records to one per identifier.
//!
//! Keys are canonical identifiers, so `S-577/25` and `577-S-2025` collapse
//! together. The stored identifier of the first record seen is kept.

use std::collections::HashMap;

use crate::identifier;
use crate::merge::{self, merge_into};
use crate::record::{Expediente, PartialRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Created,
    Updated,
}

/// Left-to-right merge over an identifier index. Output keeps first-appearance order.
#[derive(Debug, Default)]
pub struct Deduplicator {
    records: Vec<Expediente>,
    index: HashMap<String, usize>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with an already-persisted set. Seeds play the "existing" role for
    /// everything pushed afterwards; duplicates among them are merged too.
    pub fn with_existing(existing: impl IntoIterator<Item = Expediente>) -> Self {
        let mut dedup = Self::new();
        for record in existing {
            dedup.push(record);
        }
        dedup
    }

    pub fn push(&mut self, incoming: impl Into<PartialRecord>) -> MergeOutcome {
        let incoming = incoming.into();
        let key = identifier::canonicalize(&incoming.identifier);
        match self.index.get(&key) {
            Some(&i) => {
                merge_into(&mut self.records[i], incoming);
                MergeOutcome::Updated
            }
            None => {
                self.index.insert(key, self.records.len());
                self.records.push(merge::create(incoming));
                MergeOutcome::Created
            }
        }
    }

    pub fn get(&self, identifier: &str) -> Option<&Expediente> {
        self.index
            .get(&identifier::canonicalize(identifier))
            .map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn finish(self) -> Vec<Expediente> {
        self.records
    }
}

/// One record per identifier. Inputs should be ordered lowest quality first.
pub fn dedupe<I, R>(records: I) -> Vec<Expediente>
where
    I: IntoIterator<Item = R>,
    R: Into<PartialRecord>,
{
    let mut dedup = Deduplicator::new();
    for record in records {
        dedup.push(record);
    }
    dedup.finish()
}
