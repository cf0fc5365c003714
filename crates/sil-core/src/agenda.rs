//! Order of the Day ("orden del día") items and their links to case records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::identifier;
use crate::pipeline::{find_index, merge_one};
use crate::record::{Chamber, Expediente, PartialRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdenDelDia {
    pub id: String,
    /// "OD-826-25", "671/2025".
    #[serde(rename = "numero_od")]
    pub number: String,
    #[serde(rename = "camara")]
    pub chamber: Chamber,
    #[serde(rename = "fecha_od", default)]
    pub date: String,
    #[serde(rename = "comision", default)]
    pub committee: String,
    #[serde(rename = "estado", default)]
    pub status: String,
    /// Case identifiers as printed on the agenda.
    #[serde(rename = "expedientes", default)]
    pub cases: Vec<String>,
    #[serde(rename = "autores", default)]
    pub authors: Vec<String>,
    #[serde(rename = "bloque", default)]
    pub blocs: Vec<String>,
    #[serde(rename = "extracto", default)]
    pub summary: String,
    /// Senate only.
    #[serde(rename = "ministerio", default, skip_serializing_if = "Option::is_none")]
    pub ministry: Option<String>,
    #[serde(rename = "link_pdf", default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(rename = "observaciones", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OrdenDelDia {
    /// Leading number of `numero_od`, 0 when there is none.
    pub fn order_number(&self) -> u32 {
        identifier::sequence_of(&self.number)
    }
}

/// One item per id, first-appearance order.
///
/// Later non-empty scalars overwrite earlier ones; referenced cases are
/// unioned in order.
pub fn dedupe_agenda(items: impl IntoIterator<Item = OrdenDelDia>) -> Vec<OrdenDelDia> {
    let mut out: Vec<OrdenDelDia> = Vec::new();
    for item in items {
        match out.iter_mut().find(|o| o.id == item.id) {
            Some(existing) => absorb(existing, item),
            None => out.push(item),
        }
    }
    out
}

fn absorb(existing: &mut OrdenDelDia, incoming: OrdenDelDia) {
    fn take(slot: &mut String, value: String) {
        if !value.trim().is_empty() {
            *slot = value;
        }
    }
    fn take_opt(slot: &mut Option<String>, value: Option<String>) {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            *slot = Some(v);
        }
    }

    take(&mut existing.number, incoming.number);
    existing.chamber = incoming.chamber;
    take(&mut existing.date, incoming.date);
    take(&mut existing.committee, incoming.committee);
    take(&mut existing.status, incoming.status);
    take(&mut existing.summary, incoming.summary);
    take_opt(&mut existing.ministry, incoming.ministry);
    take_opt(&mut existing.document, incoming.document);
    take_opt(&mut existing.notes, incoming.notes);
    if !incoming.authors.is_empty() {
        existing.authors = incoming.authors;
    }
    if !incoming.blocs.is_empty() {
        existing.blocs = incoming.blocs;
    }
    for case in incoming.cases {
        if !existing.cases.contains(&case) {
            existing.cases.push(case);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub linked: usize,
    pub missing: usize,
}

/// Set agenda references on the records each item mentions.
///
/// Items are applied in ascending order number, so the most recent agenda wins
/// when a case appears on several. Cases not in `records` are counted, not created.
pub fn link_records(
    orders: &[OrdenDelDia],
    records: &mut Vec<Expediente>,
    today: NaiveDate,
) -> LinkStats {
    let mut ordered: Vec<&OrdenDelDia> = orders.iter().collect();
    ordered.sort_by_key(|o| o.order_number());

    let mut stats = LinkStats::default();
    for order in ordered {
        for raw in &order.cases {
            let case_id = identifier::canonicalize(raw);
            if find_index(records, &case_id).is_none() {
                debug!(agenda = %order.number, case = %raw, "agenda references unknown case");
                stats.missing += 1;
                continue;
            }

            let mut partial = PartialRecord::new(case_id.clone(), today);
            match order.chamber {
                Chamber::Deputies => partial.agenda_deputies = Some(order.number.clone()),
                Chamber::Senate => partial.agenda_senate = Some(order.number.clone()),
            }
            partial.agenda_date = Some(order.date.clone());
            partial.links.agenda_document = order.document.clone();
            merge_one(records, &case_id, partial);
            stats.linked += 1;
        }
    }
    info!(linked = stats.linked, missing = stats.missing, "linked agenda items");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge;
    use crate::sort_key::sort_agenda;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()
    }

    fn order(id: &str, number: &str, chamber: Chamber, cases: &[&str]) -> OrdenDelDia {
        OrdenDelDia {
            id: id.into(),
            number: number.into(),
            chamber,
            date: "2025-09-30".into(),
            committee: "ASUNTOS CONSTITUCIONALES".into(),
            status: "PENDIENTE en la HCDN".into(),
            cases: cases.iter().map(|c| c.to_string()).collect(),
            authors: Vec::new(),
            blocs: Vec::new(),
            summary: String::new(),
            ministry: None,
            document: None,
            notes: None,
        }
    }

    fn records(ids: &[&str]) -> Vec<Expediente> {
        ids.iter()
            .map(|id| merge::create(PartialRecord::new(*id, today())))
            .collect()
    }

    #[test]
    fn wire_format() {
        let json = r#"{
            "id": "od-826",
            "numero_od": "OD-826-25",
            "camara": "Diputados",
            "fecha_od": "2025-09-30",
            "comision": "LEGISLACION GENERAL",
            "estado": "PENDIENTE en la HCDN",
            "expedientes": ["6514-D-2025"],
            "autores": ["PÉREZ, JUAN"],
            "bloque": ["UCR"],
            "extracto": "Modificación del código civil",
            "link_pdf": "https://example.org/od826.pdf"
        }"#;
        let od: OrdenDelDia = serde_json::from_str(json).unwrap();
        assert_eq!(od.order_number(), 826);
        assert_eq!(od.chamber, Chamber::Deputies);
        assert_eq!(od.document.as_deref(), Some("https://example.org/od826.pdf"));
        assert_eq!(od.ministry, None);
    }

    #[test]
    fn dedupe_unions_cases_and_overwrites_scalars() {
        let mut second = order("a", "OD-12", Chamber::Senate, &["S-2/25", "S-3/25"]);
        second.status = "APROBADO".into();
        second.committee = String::new();
        let out = dedupe_agenda(vec![
            order("a", "OD-12", Chamber::Senate, &["S-1/25", "S-2/25"]),
            order("b", "OD-13", Chamber::Senate, &[]),
            second,
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].cases, vec!["S-1/25", "S-2/25", "S-3/25"]);
        assert_eq!(out[0].status, "APROBADO");
        assert_eq!(out[0].committee, "ASUNTOS CONSTITUCIONALES");
    }

    #[test]
    fn sorted_by_leading_number_descending() {
        let mut items = vec![
            order("a", "671/2025", Chamber::Senate, &[]),
            order("b", "OD-826-25", Chamber::Deputies, &[]),
            order("c", "sin número", Chamber::Deputies, &[]),
            order("d", "OD-90", Chamber::Deputies, &[]),
        ];
        sort_agenda(&mut items);
        let ids: Vec<_> = items.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "d", "c"]);
    }

    #[test]
    fn links_canonicalized_cases() {
        let mut recs = records(&["1930-S-2025", "6514-D-2025"]);
        let mut senate = order("s", "671/2025", Chamber::Senate, &["S-1930/2025", "S-9/25"]);
        senate.document = Some("https://example.org/671.pdf".into());

        let stats = link_records(&[senate], &mut recs, today());
        assert_eq!(stats, LinkStats { linked: 1, missing: 1 });
        assert_eq!(recs.len(), 2);

        let linked = &recs[find_index(&recs, "1930-S-2025").unwrap()];
        assert_eq!(linked.agenda_senate.as_deref(), Some("671/2025"));
        assert_eq!(linked.agenda_deputies, None);
        assert_eq!(linked.agenda_date.as_deref(), Some("2025-09-30"));
        assert_eq!(
            linked.links.agenda_document.as_deref(),
            Some("https://example.org/671.pdf")
        );
        assert!(linked.has_agenda());
    }

    #[test]
    fn highest_order_number_wins() {
        let mut recs = records(&["10-D-2025"]);
        let orders = [
            order("new", "OD-900", Chamber::Deputies, &["10-D-2025"]),
            order("old", "OD-100", Chamber::Deputies, &["10-D-2025"]),
        ];
        link_records(&orders, &mut recs, today());
        assert_eq!(recs[0].agenda_deputies.as_deref(), Some("OD-900"));
    }
}
