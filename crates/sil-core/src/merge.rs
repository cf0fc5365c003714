//! Field-level merge of a partial record into a canonical one.
//!
//! Precedence, per field:
//!
//! | Field                              | Winner                                              |
//! |------------------------------------|-----------------------------------------------------|
//! | signatories (authors/blocs/prov.)  | incoming iff it has signatories and existing has none |
//! | summary                            | incoming iff existing is the sentinel and incoming is not |
//! | procedures, referrals, reports     | incoming when non-empty                             |
//! | entry date                         | existing, unless inferred and incoming was parsed   |
//! | case type                          | incoming when not the default                       |
//! | status, links, agenda, publication | incoming when present                               |
//! | internal movements                 | union by id, never removed                          |
//! | chamber                            | the identifier's code                               |

use thiserror::Error;
use tracing::warn;

use crate::extract::{DEFAULT_CASE_TYPE, distinct};
use crate::identifier;
use crate::record::{
    Chamber, DEFAULT_STATUS, Expediente, MAX_AUTHORS, NO_SUMMARY, PartialRecord,
    UNKNOWN_LEGISLATOR,
};

/// A source declared a chamber that contradicts the identifier's code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{identifier}: declared chamber {declared} contradicts identifier chamber {from_identifier}")]
pub struct MergeConflict {
    pub identifier: String,
    pub from_identifier: Chamber,
    pub declared: Chamber,
}

/// Merge `incoming` over `existing`, or create a record from it.
pub fn merge(existing: Option<Expediente>, incoming: PartialRecord) -> Expediente {
    match existing {
        Some(mut record) => {
            merge_into(&mut record, incoming);
            record
        }
        None => create(incoming),
    }
}

/// Create a canonical record from a partial one.
pub fn create(incoming: PartialRecord) -> Expediente {
    let chamber = reconcile_chamber(&incoming.identifier, None, incoming.chamber);
    let mut record = Expediente {
        id: incoming
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| incoming.identifier.clone()),
        identifier: incoming.identifier,
        case_type: incoming.case_type,
        chamber,
        status: present(incoming.status).unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        entry_date: incoming.entry_date,
        entry_date_inferred: incoming.entry_date_inferred,
        authors: incoming.authors,
        blocs: incoming.blocs,
        provinces: incoming.provinces,
        referrals: incoming.referrals,
        summary: incoming.summary,
        abstract_text: present(incoming.abstract_text),
        signatories: incoming.signatories,
        procedures: incoming.procedures,
        reports: incoming.reports,
        movements: Vec::new(),
        agenda_deputies: present(incoming.agenda_deputies),
        agenda_senate: present(incoming.agenda_senate),
        agenda_date: present(incoming.agenda_date),
        links: incoming.links,
        publication: present(incoming.publication),
        gazette_reference: present(incoming.gazette_reference),
    };
    union_movements(&mut record, incoming.movements);
    normalize(&mut record);
    record
}

/// Merge `incoming` into `record` in place.
pub fn merge_into(record: &mut Expediente, incoming: PartialRecord) {
    if identifier::canonicalize(&record.identifier) != identifier::canonicalize(&incoming.identifier) {
        warn!(
            existing = %record.identifier,
            incoming = %incoming.identifier,
            "merging records with different identifiers, keeping existing"
        );
    }

    record.chamber = reconcile_chamber(&record.identifier, Some(record.chamber), incoming.chamber);

    // ── Signatory-derived ──
    if record.signatories.is_empty() {
        if !incoming.signatories.is_empty() {
            record.signatories = incoming.signatories;
            record.blocs = incoming.blocs;
            record.provinces = incoming.provinces;
        } else {
            if is_unknown(&record.authors) && !is_unknown(&incoming.authors) {
                record.authors = incoming.authors;
            }
            if record.blocs.is_empty() {
                record.blocs = incoming.blocs;
            }
            if record.provinces.is_empty() {
                record.provinces = incoming.provinces;
            }
        }
    }

    // ── Summary ──
    if record.summary == NO_SUMMARY && incoming.summary != NO_SUMMARY {
        record.summary = incoming.summary;
        if let Some(abstract_text) = present(incoming.abstract_text) {
            record.abstract_text = Some(abstract_text);
        }
    } else if record.abstract_text.is_none() {
        record.abstract_text = present(incoming.abstract_text);
    }

    // ── Snapshots ──
    if !incoming.procedures.is_empty() {
        record.procedures = incoming.procedures;
    }
    if !incoming.referrals.is_empty() {
        record.referrals = incoming.referrals;
    }
    if !incoming.reports.is_empty() {
        record.reports = incoming.reports;
    }

    if record.entry_date_inferred && !incoming.entry_date_inferred {
        record.entry_date = incoming.entry_date;
        record.entry_date_inferred = false;
    }

    if incoming.case_type != DEFAULT_CASE_TYPE && !incoming.case_type.trim().is_empty() {
        record.case_type = incoming.case_type;
    }

    // ── Scalars ──
    if let Some(status) = present(incoming.status) {
        record.status = status;
    }
    overwrite(&mut record.agenda_deputies, incoming.agenda_deputies);
    overwrite(&mut record.agenda_senate, incoming.agenda_senate);
    overwrite(&mut record.agenda_date, incoming.agenda_date);
    overwrite(&mut record.links.case_document, incoming.links.case_document);
    overwrite(&mut record.links.agenda_document, incoming.links.agenda_document);
    overwrite(&mut record.publication, incoming.publication);
    overwrite(&mut record.gazette_reference, incoming.gazette_reference);

    union_movements(record, incoming.movements);
    normalize(record);
}

/// Re-derive signatory-backed fields and restore the non-empty invariants.
pub fn normalize(record: &mut Expediente) {
    if !record.signatories.is_empty() {
        let mut authors = distinct(
            record
                .signatories
                .iter()
                .map(|s| s.name.trim().to_string())
                .filter(|n| !n.is_empty()),
        );
        authors.truncate(MAX_AUTHORS);
        record.authors = authors;

        let blocs = distinct(record.signatories.iter().filter_map(|s| s.bloc.clone()));
        if !blocs.is_empty() {
            record.blocs = blocs;
        }
        let provinces = distinct(record.signatories.iter().filter_map(|s| s.district.clone()));
        if !provinces.is_empty() {
            record.provinces = provinces;
        }
    }

    if record.authors.is_empty() {
        record.authors = vec![UNKNOWN_LEGISLATOR.to_string()];
    }
    if record.summary.trim().is_empty() {
        record.summary = NO_SUMMARY.to_string();
    }
    record.blocs = distinct(std::mem::take(&mut record.blocs));
    record.provinces = distinct(std::mem::take(&mut record.provinces));
}

/// The identifier's chamber code wins over anything a source declared.
fn reconcile_chamber(identifier: &str, current: Option<Chamber>, declared: Option<Chamber>) -> Chamber {
    let Some(from_identifier) = identifier::chamber_of(identifier) else {
        return declared.or(current).unwrap_or(Chamber::Deputies);
    };
    for other in [current, declared].into_iter().flatten() {
        if other != from_identifier {
            let conflict = MergeConflict {
                identifier: identifier.to_string(),
                from_identifier,
                declared: other,
            };
            warn!(%conflict, "chamber conflict, identifier wins");
        }
    }
    from_identifier
}

fn union_movements(record: &mut Expediente, incoming: Vec<crate::record::InternalMovement>) {
    for movement in incoming {
        if !record.movements.iter().any(|m| m.id == movement.id) {
            record.movements.push(movement);
        }
    }
}

fn is_unknown(authors: &[String]) -> bool {
    authors.is_empty() || authors.iter().all(|a| a == UNKNOWN_LEGISLATOR)
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn overwrite(slot: &mut Option<String>, incoming: Option<String>) {
    if let Some(v) = present(incoming) {
        *slot = Some(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{InternalMovement, Signatory, SignatoryRole};
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()
    }

    fn partial(identifier: &str) -> PartialRecord {
        PartialRecord::new(identifier, today())
    }

    fn signatory(name: &str, bloc: Option<&str>, district: Option<&str>) -> Signatory {
        Signatory {
            name: name.into(),
            district: district.map(String::from),
            bloc: bloc.map(String::from),
            role: None,
        }
    }

    fn movement(id: &str) -> InternalMovement {
        InternalMovement {
            id: id.into(),
            date: "2025-10-02".into(),
            from: "Mesa de entradas".into(),
            to: "Despacho".into(),
            note: "Recibido".into(),
            attachments: Vec::new(),
            handled_by: Some("System".into()),
        }
    }

    #[test]
    fn create_applies_defaults() {
        let rec = merge(None, partial("10-D-2025"));
        assert_eq!(rec.id, "10-D-2025");
        assert_eq!(rec.status, DEFAULT_STATUS);
        assert_eq!(rec.chamber, Chamber::Deputies);
        assert_eq!(rec.authors, vec![UNKNOWN_LEGISLATOR]);
        assert!(rec.entry_date_inferred);
    }

    #[test]
    fn detail_scrape_fills_sentinel_summary_and_signatories() {
        let existing = merge(None, partial("10-D-2025"));
        let mut incoming = partial("10-D-2025");
        incoming.summary = "Full text...".into();
        incoming.signatories = vec![signatory("A", None, None), signatory("B", None, None)];

        let rec = merge(Some(existing), incoming);
        assert_eq!(rec.summary, "Full text...");
        assert_eq!(rec.authors, vec!["A", "B"]);
    }

    #[test]
    fn detailed_summary_survives_low_detail_rescan() {
        let mut first = partial("10-D-2025");
        first.summary = "Already detailed".into();
        let existing = merge(None, first);

        let rec = merge(Some(existing), partial("10-D-2025"));
        assert_eq!(rec.summary, "Already detailed");
    }

    #[test]
    fn later_detailed_summary_does_not_replace_earlier_one() {
        let mut first = partial("10-D-2025");
        first.summary = "First".into();
        let mut second = partial("10-D-2025");
        second.summary = "Second".into();
        let rec = merge(Some(merge(None, first)), second);
        assert_eq!(rec.summary, "First");
    }

    #[test]
    fn existing_signatories_are_kept() {
        let mut first = partial("10-D-2025");
        first.signatories = vec![signatory("A", Some("UCR"), Some("CÓRDOBA"))];
        let existing = merge(None, first);

        let mut incoming = partial("10-D-2025");
        incoming.signatories = vec![signatory("Z", Some("PRO"), Some("SALTA"))];
        incoming.authors = vec!["Z".into()];
        let rec = merge(Some(existing), incoming);

        assert_eq!(rec.authors, vec!["A"]);
        assert_eq!(rec.blocs, vec!["UCR"]);
        assert_eq!(rec.provinces, vec!["CÓRDOBA"]);
    }

    #[test]
    fn authors_follow_signatories() {
        let mut p = partial("10-D-2025");
        p.authors = vec!["ignored".into()];
        p.signatories = ["A", "B", "A", "C", "D", "E", "F"]
            .iter()
            .map(|n| signatory(n, Some("UCR"), None))
            .collect();
        let rec = merge(None, p);
        assert_eq!(rec.authors, vec!["A", "B", "C", "D", "E"]);
        assert_eq!(rec.blocs, vec!["UCR"]);
        assert!(rec.provinces.is_empty());
    }

    #[test]
    fn plain_authors_replace_only_the_sentinel() {
        let existing = merge(None, partial("10-D-2025"));
        let mut incoming = partial("10-D-2025");
        incoming.authors = vec!["PÉREZ, JUAN".into()];
        incoming.blocs = vec!["UCR".into()];
        let rec = merge(Some(existing), incoming);
        assert_eq!(rec.authors, vec!["PÉREZ, JUAN"]);
        assert_eq!(rec.blocs, vec!["UCR"]);

        let mut later = partial("10-D-2025");
        later.authors = vec!["OTRO".into()];
        later.blocs = vec!["PRO".into()];
        let rec = merge(Some(rec), later);
        assert_eq!(rec.authors, vec!["PÉREZ, JUAN"]);
        assert_eq!(rec.blocs, vec!["UCR"]);
    }

    #[test]
    fn movements_survive_enrichment() {
        let mut existing = merge(None, partial("10-D-2025"));
        existing.movements.push(movement("mov-1"));

        let mut scrape = partial("10-D-2025");
        scrape.summary = "Nuevo".into();
        let rec = merge(Some(existing), scrape);
        assert_eq!(rec.movements, vec![movement("mov-1")]);
    }

    #[test]
    fn movements_are_unioned_by_id() {
        let mut existing = merge(None, partial("10-D-2025"));
        existing.movements.push(movement("mov-1"));
        let mut incoming = partial("10-D-2025");
        incoming.movements = vec![movement("mov-1"), movement("mov-2")];
        let rec = merge(Some(existing), incoming);
        let ids: Vec<_> = rec.movements.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["mov-1", "mov-2"]);
    }

    #[test]
    fn inferred_entry_date_gives_way_to_parsed() {
        let existing = merge(None, partial("10-D-2025"));
        let parsed = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();

        let mut incoming = partial("10-D-2025");
        incoming.entry_date = parsed;
        incoming.entry_date_inferred = false;
        let rec = merge(Some(existing), incoming);
        assert_eq!(rec.entry_date, parsed);
        assert!(!rec.entry_date_inferred);

        let mut later = partial("10-D-2025");
        later.entry_date = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();
        later.entry_date_inferred = false;
        let rec = merge(Some(rec), later);
        assert_eq!(rec.entry_date, parsed);
    }

    #[test]
    fn case_type_default_never_overrides() {
        let mut first = partial("10-D-2025");
        first.case_type = "Bill".into();
        let rec = merge(Some(merge(None, first)), partial("10-D-2025"));
        assert_eq!(rec.case_type, "Bill");

        let mut second = partial("10-D-2025");
        second.case_type = "Resolution".into();
        let rec = merge(Some(rec), second);
        assert_eq!(rec.case_type, "Resolution");
    }

    #[test]
    fn snapshots_replace_only_when_non_empty() {
        let mut first = partial("10-D-2025");
        first.referrals = vec![crate::record::CommitteeReferral {
            committee: "PRESUPUESTO".into(),
            date: String::new(),
            status: String::new(),
        }];
        let rec = merge(Some(merge(None, first)), partial("10-D-2025"));
        assert_eq!(rec.referrals.len(), 1);
    }

    #[test]
    fn scalars_overwrite_when_present() {
        let mut first = partial("10-D-2025");
        first.status = Some("In Committee".into());
        first.agenda_deputies = Some("OD-1".into());
        let existing = merge(None, first);

        let mut incoming = partial("10-D-2025");
        incoming.status = Some("  ".into());
        incoming.agenda_deputies = Some("OD-2".into());
        let rec = merge(Some(existing), incoming);
        assert_eq!(rec.status, "In Committee");
        assert_eq!(rec.agenda_deputies.as_deref(), Some("OD-2"));
    }

    #[test]
    fn identifier_chamber_wins() {
        let mut p = partial("10-D-2025");
        p.chamber = Some(Chamber::Senate);
        let rec = merge(None, p);
        assert_eq!(rec.chamber, Chamber::Deputies);

        let mut q = partial("0001-PL-25");
        q.chamber = None;
        assert_eq!(merge(None, q).chamber, Chamber::Senate);

        let mut r = partial("1234");
        r.chamber = Some(Chamber::Senate);
        assert_eq!(merge(None, r).chamber, Chamber::Senate);
    }

    #[test]
    fn merge_is_idempotent_on_canonical_records() {
        let mut p = partial("10-D-2025");
        p.summary = "Texto".into();
        p.signatories = vec![Signatory {
            role: Some(SignatoryRole::Author),
            ..signatory("A", Some("UCR"), Some("SALTA"))
        }];
        let rec = merge(None, p);
        let again = merge(Some(rec.clone()), PartialRecord::from(rec.clone()));
        assert_eq!(again, rec);
        assert_eq!(merge(None, PartialRecord::from(rec.clone())), rec);
    }
}
