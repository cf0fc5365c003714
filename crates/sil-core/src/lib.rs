pub mod agenda;
pub mod aliases;
pub mod dates;
pub mod dedupe;
pub mod extract;
pub mod identifier;
pub mod merge;
pub mod pipeline;
pub mod record;
pub mod sort_key;

pub use agenda::{LinkStats, OrdenDelDia, dedupe_agenda, link_records};
pub use dedupe::{Deduplicator, MergeOutcome, dedupe};
pub use extract::{FieldExtractor, RawRow, SourceKind, SourceRow};
pub use identifier::{CaseNumber, ChamberCode, ParseFailure};
pub use merge::{MergeConflict, merge};
pub use pipeline::{Pipeline, RecordStore, RunOutput, RunStats, find_index, merge_one};
pub use record::{
    Chamber, CommitteeReferral, CommitteeReport, Expediente, ExternalLinks, InternalMovement,
    PartialRecord, ProcedureStep, Signatory, SignatoryRole,
};
pub use sort_key::{SortKey, sort_agenda, sort_records};
