//! Search, faceted filtering, facet catalogs and summary statistics.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;
use sil_core::extract::DEFAULT_CASE_TYPE;
use sil_core::{Chamber, Expediente};

/// Placeholder bloc some sources emit when the real one is unknown.
pub const PLACEHOLDER_BLOC: &str = "BLOQUE PARLAMENTARIO";

pub const KNOWN_BLOCS: &[&str] = &[
    "LA LIBERTAD AVANZA",
    "PRO",
    "UNIÓN POR LA PATRIA",
    "UCR - EVOLUCIÓN RADICAL",
    "HACEMOS COALICIÓN FEDERAL",
    "INNOVACIÓN FEDERAL",
    "MOVIMIENTO POPULAR NEUQUINO",
    "POR SANTA CRUZ",
    "COALICIÓN CÍVICA - ARI",
    "FRENTE DE IZQUIERDA Y DE TRABAJADORES - UNIDAD",
    "PRODUCCIÓN Y TRABAJO",
    "UNIDAD FEDERAL",
    "BLOQUE JUSTICIALISTA",
    "FRENTE RENOVADOR",
    "SOCIALISTA",
    "DEMOCRATA CRISTIANO",
];

pub const KNOWN_PROVINCES: &[&str] = &[
    "BUENOS AIRES",
    "CABA",
    "CATAMARCA",
    "CHACO",
    "CHUBUT",
    "CÓRDOBA",
    "CORRIENTES",
    "ENTRE RÍOS",
    "FORMOSA",
    "JUJUY",
    "LA PAMPA",
    "LA RIOJA",
    "MENDOZA",
    "MISIONES",
    "NEUQUÉN",
    "RÍO NEGRO",
    "SALTA",
    "SAN JUAN",
    "SAN LUIS",
    "SANTA CRUZ",
    "SANTA FE",
    "SANTIAGO DEL ESTERO",
    "TIERRA DEL FUEGO",
    "TUCUMÁN",
];

// ── Search ──

/// Case-insensitive substring match on identifier, summary and authors.
/// An empty query matches everything.
pub fn search<'a>(records: &'a [Expediente], query: &str) -> Vec<&'a Expediente> {
    let q = query.trim().to_lowercase();
    records
        .iter()
        .filter(|r| {
            q.is_empty()
                || r.identifier.to_lowercase().contains(&q)
                || r.summary.to_lowercase().contains(&q)
                || r.authors.iter().any(|a| a.to_lowercase().contains(&q))
        })
        .collect()
}

// ── Filter ──

/// Facet filter. Empty lists and `None` leave a facet unconstrained; list
/// facets match when any value matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub chamber: Option<Chamber>,
    pub case_types: Vec<String>,
    pub statuses: Vec<String>,
    pub blocs: Vec<String>,
    pub provinces: Vec<String>,
    pub has_agenda: Option<bool>,
    pub in_committee: Option<bool>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl Filter {
    pub fn matches(&self, r: &Expediente) -> bool {
        self.chamber.is_none_or(|c| r.chamber == c)
            && any_of(&self.case_types, std::slice::from_ref(&r.case_type))
            && any_of(&self.statuses, std::slice::from_ref(&r.status))
            && any_of(&self.blocs, &r.blocs)
            && any_of(&self.provinces, &r.provinces)
            && self.has_agenda.is_none_or(|want| r.has_agenda() == want)
            && self.in_committee.is_none_or(|want| r.in_committee() == want)
            && self.date_from.is_none_or(|from| r.entry_date >= from)
            && self.date_to.is_none_or(|to| r.entry_date <= to)
    }

    pub fn apply<'a>(&self, records: &'a [Expediente]) -> Vec<&'a Expediente> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

fn any_of(wanted: &[String], values: &[String]) -> bool {
    wanted.is_empty()
        || wanted
            .iter()
            .any(|w| values.iter().any(|v| v.eq_ignore_ascii_case(w.trim())))
}

// ── Catalogs ──

/// Known blocs plus every bloc seen on a record or signatory, sorted.
pub fn bloc_catalog(records: &[Expediente]) -> Vec<String> {
    let mut set: BTreeSet<String> = KNOWN_BLOCS.iter().map(|b| b.to_string()).collect();
    for r in records {
        let observed = r
            .blocs
            .iter()
            .chain(r.signatories.iter().filter_map(|s| s.bloc.as_ref()));
        set.extend(
            observed
                .filter(|b| !b.trim().is_empty() && b.as_str() != PLACEHOLDER_BLOC)
                .cloned(),
        );
    }
    set.into_iter().collect()
}

/// Known provinces plus every province or district seen, sorted.
pub fn province_catalog(records: &[Expediente]) -> Vec<String> {
    let mut set: BTreeSet<String> = KNOWN_PROVINCES.iter().map(|p| p.to_string()).collect();
    for r in records {
        let observed = r
            .provinces
            .iter()
            .chain(r.signatories.iter().filter_map(|s| s.district.as_ref()));
        set.extend(observed.filter(|p| !p.trim().is_empty()).cloned());
    }
    set.into_iter().collect()
}

// ── Stats ──

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub deputies: usize,
    pub senate: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub with_agenda: usize,
    pub in_committee: usize,
    pub with_signatories: usize,
    pub with_movements: usize,
    pub information_requests: usize,
}

pub fn stats(records: &[Expediente]) -> Stats {
    let mut s = Stats {
        total: records.len(),
        ..Stats::default()
    };
    for r in records {
        match r.chamber {
            Chamber::Deputies => s.deputies += 1,
            Chamber::Senate => s.senate += 1,
        }
        *s.by_type.entry(r.case_type.clone()).or_default() += 1;
        *s.by_status.entry(r.status.clone()).or_default() += 1;
        s.with_agenda += usize::from(r.has_agenda());
        s.in_committee += usize::from(r.in_committee());
        s.with_signatories += usize::from(!r.signatories.is_empty());
        s.with_movements += usize::from(!r.movements.is_empty());
        s.information_requests += usize::from(r.case_type == DEFAULT_CASE_TYPE);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use sil_core::{CommitteeReferral, PartialRecord, Signatory, merge};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(identifier: &str, summary: &str, case_type: &str, date: NaiveDate) -> Expediente {
        let mut p = PartialRecord::new(identifier, date);
        p.summary = summary.into();
        p.case_type = case_type.into();
        p.entry_date_inferred = false;
        merge(None, p)
    }

    fn sample() -> Vec<Expediente> {
        let mut a = record("1-D-2025", "Obras viales en Salta", "Bill", day(2025, 3, 1));
        a.authors = vec!["PÉREZ, JUAN".into()];
        a.blocs = vec!["UCR".into()];
        a.provinces = vec!["SALTA".into()];
        a.agenda_deputies = Some("OD-12".into());

        let mut b = record("2-S-2025", "Pedido de informes", DEFAULT_CASE_TYPE, day(2025, 5, 1));
        b.referrals = vec![CommitteeReferral {
            committee: "PRESUPUESTO".into(),
            date: String::new(),
            status: String::new(),
        }];
        b.blocs = vec![PLACEHOLDER_BLOC.into()];
        b.signatories = vec![Signatory {
            name: "GÓMEZ, ANA".into(),
            district: Some("TERRITORIO NUEVO".into()),
            bloc: Some("BLOQUE NUEVO".into()),
            role: None,
        }];

        let c = record("3-D-2024", "Régimen de pesca", "Resolution", day(2024, 11, 20));
        vec![a, b, c]
    }

    fn ids(found: Vec<&Expediente>) -> Vec<&str> {
        found.into_iter().map(|r| r.identifier.as_str()).collect()
    }

    #[test]
    fn search_fields() {
        let recs = sample();
        assert_eq!(ids(search(&recs, "salta")), vec!["1-D-2025"]);
        assert_eq!(ids(search(&recs, "pérez")), vec!["1-D-2025"]);
        assert_eq!(ids(search(&recs, "2-S")), vec!["2-S-2025"]);
        assert_eq!(search(&recs, "  ").len(), 3);
        assert!(search(&recs, "inexistente").is_empty());
    }

    #[test]
    fn filter_facets() {
        let recs = sample();
        let f = Filter {
            chamber: Some(Chamber::Deputies),
            ..Filter::default()
        };
        assert_eq!(ids(f.apply(&recs)), vec!["1-D-2025", "3-D-2024"]);

        let f = Filter {
            case_types: vec!["bill".into(), "Resolution".into()],
            date_from: Some(day(2025, 1, 1)),
            ..Filter::default()
        };
        assert_eq!(ids(f.apply(&recs)), vec!["1-D-2025"]);

        let f = Filter {
            has_agenda: Some(true),
            ..Filter::default()
        };
        assert_eq!(ids(f.apply(&recs)), vec!["1-D-2025"]);

        let f = Filter {
            in_committee: Some(true),
            ..Filter::default()
        };
        assert_eq!(ids(f.apply(&recs)), vec!["2-S-2025"]);

        let f = Filter {
            provinces: vec!["SALTA".into()],
            date_to: Some(day(2025, 3, 1)),
            ..Filter::default()
        };
        assert_eq!(ids(f.apply(&recs)), vec!["1-D-2025"]);

        assert_eq!(Filter::default().apply(&recs).len(), 3);
    }

    #[test]
    fn catalogs_include_observed_values() {
        let recs = sample();
        let blocs = bloc_catalog(&recs);
        assert!(blocs.contains(&"BLOQUE NUEVO".to_string()));
        assert!(blocs.contains(&"UCR".to_string()));
        assert!(blocs.contains(&"PRO".to_string()));
        assert!(!blocs.contains(&PLACEHOLDER_BLOC.to_string()));
        assert!(blocs.windows(2).all(|w| w[0] < w[1]));

        let provinces = province_catalog(&recs);
        assert!(provinces.contains(&"TERRITORIO NUEVO".to_string()));
        assert_eq!(provinces.len(), KNOWN_PROVINCES.len() + 1);
    }

    #[test]
    fn stats_counts() {
        let s = stats(&sample());
        assert_eq!(s.total, 3);
        assert_eq!(s.deputies, 2);
        assert_eq!(s.senate, 1);
        assert_eq!(s.by_type["Bill"], 1);
        assert_eq!(s.by_status["Submitted"], 3);
        assert_eq!(s.with_agenda, 1);
        assert_eq!(s.in_committee, 1);
        assert_eq!(s.with_signatories, 1);
        assert_eq!(s.with_movements, 0);
        assert_eq!(s.information_requests, 1);
    }
}
