//! Canonical case record ("expediente") and the partial records sources produce.
//!
//! Field names on the wire match the JSON files the browsing UI reads, so the
//! serde renames below are part of the storage format.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::extract::SourceKind;
use crate::identifier::{self, CaseNumber, ParseFailure};

/// Summary sentinel for records whose sources carried no summary text.
pub const NO_SUMMARY: &str = "No summary available";

/// Author sentinel; the author list is never empty.
pub const UNKNOWN_LEGISLATOR: &str = "Unknown Legislator";

/// Status given to records created without any status column.
pub const DEFAULT_STATUS: &str = "Submitted";

/// Upper bound on derived author lists.
pub const MAX_AUTHORS: usize = 5;

// ── Chamber ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chamber {
    #[serde(rename = "Diputados")]
    Deputies,
    #[serde(rename = "Senado")]
    Senate,
}

impl Chamber {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deputies => "Diputados",
            Self::Senate => "Senado",
        }
    }

    /// Single-letter code used in canonical identifiers.
    pub fn code(&self) -> char {
        match self {
            Self::Deputies => 'D',
            Self::Senate => 'S',
        }
    }

    /// Read a free-text chamber label ("Diputados", "Cámara de Senadores", "S", "HCDN").
    pub fn from_label(label: &str) -> Option<Self> {
        let folded = label.trim().to_lowercase();
        match folded.as_str() {
            "" => None,
            "d" | "p" | "hcdn" => Some(Self::Deputies),
            "s" | "hsn" => Some(Self::Senate),
            _ if folded.contains("diput") || folded.contains("deput") => Some(Self::Deputies),
            _ if folded.contains("senad") || folded.contains("senat") => Some(Self::Senate),
            _ => None,
        }
    }
}

impl fmt::Display for Chamber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Nested entries ──

/// Referral of a case to a legislative committee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeReferral {
    #[serde(rename = "comision")]
    pub committee: String,
    #[serde(rename = "fecha", default)]
    pub date: String,
    #[serde(rename = "estado", default)]
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatoryRole {
    #[serde(rename = "autor")]
    Author,
    #[serde(rename = "coautor")]
    Cosigner,
}

/// A legislator who filed or co-signed the case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatory {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "distrito", default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(rename = "bloque", default, skip_serializing_if = "Option::is_none")]
    pub bloc: Option<String>,
    #[serde(rename = "tipo", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<SignatoryRole>,
}

/// One movement of the case between chambers, as published officially.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureStep {
    #[serde(rename = "fecha", default)]
    pub date: String,
    #[serde(rename = "camara", default, skip_serializing_if = "Option::is_none")]
    pub chamber: Option<String>,
    #[serde(rename = "movimiento")]
    pub action: String,
    #[serde(rename = "resultado", default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Committee report ("dictamen") issued on the case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeReport {
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "fecha", default)]
    pub date: String,
    #[serde(rename = "descripcion", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Manually recorded internal tracking entry. Never produced by scraping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalMovement {
    pub id: String,
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "emisor")]
    pub from: String,
    #[serde(rename = "destino")]
    pub to: String,
    #[serde(rename = "novedad")]
    pub note: String,
    #[serde(rename = "comprobantes", default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    #[serde(rename = "realizadoPor", default, skip_serializing_if = "Option::is_none")]
    pub handled_by: Option<String>,
}

/// URLs to the official source documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLinks {
    #[serde(rename = "Link_EXPTE", default, skip_serializing_if = "Option::is_none")]
    pub case_document: Option<String>,
    #[serde(rename = "Link_OD", default, skip_serializing_if = "Option::is_none")]
    pub agenda_document: Option<String>,
}

// ── Canonical record ──

/// The canonical case record. Exactly one per identifier in the persisted set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expediente {
    pub id: String,
    #[serde(rename = "expediente")]
    pub identifier: String,
    #[serde(rename = "tipo_expediente")]
    pub case_type: String,
    #[serde(rename = "cámara")]
    pub chamber: Chamber,
    #[serde(rename = "estado")]
    pub status: String,
    #[serde(rename = "fecha_ingreso", with = "dates::iso")]
    pub entry_date: NaiveDate,
    /// `entry_date` was defaulted to the ingestion day, not read from a source.
    #[serde(rename = "fecha_ingreso_inferida", default, skip_serializing_if = "is_false")]
    pub entry_date_inferred: bool,
    #[serde(rename = "autores")]
    pub authors: Vec<String>,
    #[serde(rename = "bloque", default)]
    pub blocs: Vec<String>,
    #[serde(rename = "provincias", default)]
    pub provinces: Vec<String>,
    #[serde(rename = "derivaciones", default)]
    pub referrals: Vec<CommitteeReferral>,
    #[serde(rename = "sumario")]
    pub summary: String,
    #[serde(rename = "extracto", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(rename = "firmantes", default, skip_serializing_if = "Vec::is_empty")]
    pub signatories: Vec<Signatory>,
    #[serde(rename = "tramites", default, skip_serializing_if = "Vec::is_empty")]
    pub procedures: Vec<ProcedureStep>,
    #[serde(rename = "dictamenes", default, skip_serializing_if = "Vec::is_empty")]
    pub reports: Vec<CommitteeReport>,
    #[serde(rename = "movimientos_internos", default, skip_serializing_if = "Vec::is_empty")]
    pub movements: Vec<InternalMovement>,
    #[serde(rename = "OD_DIPUTADOS", default, skip_serializing_if = "Option::is_none")]
    pub agenda_deputies: Option<String>,
    #[serde(rename = "OD_SENADO", default, skip_serializing_if = "Option::is_none")]
    pub agenda_senate: Option<String>,
    #[serde(rename = "Fecha_OD", default, skip_serializing_if = "Option::is_none")]
    pub agenda_date: Option<String>,
    #[serde(flatten)]
    pub links: ExternalLinks,
    /// Publication number in the parliamentary gazette ("142").
    #[serde(rename = "TP", default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<String>,
    /// Gazette reference as printed ("TP-142"). Kept beside `TP`, which older
    /// files also carry.
    #[serde(rename = "tramite_parlamentario", default, skip_serializing_if = "Option::is_none")]
    pub gazette_reference: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Expediente {
    pub fn case_number(&self) -> Result<CaseNumber, ParseFailure> {
        identifier::parse(&self.identifier)
    }

    /// Parsed sequence number, 0 when the identifier has none.
    pub fn sequence(&self) -> u32 {
        identifier::sequence_of(&self.identifier)
    }

    pub fn has_agenda(&self) -> bool {
        is_set(&self.agenda_deputies) || is_set(&self.agenda_senate)
    }

    /// Referred to at least one committee, or a status that says so.
    pub fn in_committee(&self) -> bool {
        let status = self.status.to_lowercase();
        !self.referrals.is_empty()
            || status.contains("comisión")
            || status.contains("comision")
            || status.contains("committee")
    }

    pub fn has_summary(&self) -> bool {
        self.summary != NO_SUMMARY
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

// ── Partial record ──

/// What one source row says about a case.
///
/// Required fields (`case_type`, `summary`, `authors`, `entry_date`) are
/// always filled, with sentinels when the source had nothing. Fields a source
/// may simply not carry (`status`, agenda refs, links) stay `None` so a merge
/// never mistakes "not reported" for "reported empty".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialRecord {
    pub identifier: String,
    /// Record id to keep when this partial is a re-fed canonical record.
    pub id: Option<String>,
    pub source: Option<SourceKind>,
    pub chamber: Option<Chamber>,
    pub case_type: String,
    pub status: Option<String>,
    pub entry_date: NaiveDate,
    pub entry_date_inferred: bool,
    pub authors: Vec<String>,
    pub blocs: Vec<String>,
    pub provinces: Vec<String>,
    pub summary: String,
    pub abstract_text: Option<String>,
    pub referrals: Vec<CommitteeReferral>,
    pub signatories: Vec<Signatory>,
    pub procedures: Vec<ProcedureStep>,
    pub reports: Vec<CommitteeReport>,
    pub movements: Vec<InternalMovement>,
    pub agenda_deputies: Option<String>,
    pub agenda_senate: Option<String>,
    pub agenda_date: Option<String>,
    pub links: ExternalLinks,
    pub publication: Option<String>,
    pub gazette_reference: Option<String>,
}

impl PartialRecord {
    /// A partial that asserts nothing beyond the identifier.
    ///
    /// Merging it into an existing record changes nothing; callers set the
    /// fields they actually know.
    pub fn new(identifier: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            identifier: identifier.into(),
            id: None,
            source: None,
            chamber: None,
            case_type: crate::extract::DEFAULT_CASE_TYPE.to_string(),
            status: None,
            entry_date: today,
            entry_date_inferred: true,
            authors: vec![UNKNOWN_LEGISLATOR.to_string()],
            blocs: Vec::new(),
            provinces: Vec::new(),
            summary: NO_SUMMARY.to_string(),
            abstract_text: None,
            referrals: Vec::new(),
            signatories: Vec::new(),
            procedures: Vec::new(),
            reports: Vec::new(),
            movements: Vec::new(),
            agenda_deputies: None,
            agenda_senate: None,
            agenda_date: None,
            links: ExternalLinks::default(),
            publication: None,
            gazette_reference: None,
        }
    }
}

impl From<Expediente> for PartialRecord {
    fn from(record: Expediente) -> Self {
        Self {
            identifier: record.identifier,
            id: Some(record.id),
            source: None,
            chamber: Some(record.chamber),
            case_type: record.case_type,
            status: Some(record.status),
            entry_date: record.entry_date,
            entry_date_inferred: record.entry_date_inferred,
            authors: record.authors,
            blocs: record.blocs,
            provinces: record.provinces,
            summary: record.summary,
            abstract_text: record.abstract_text,
            referrals: record.referrals,
            signatories: record.signatories,
            procedures: record.procedures,
            reports: record.reports,
            movements: record.movements,
            agenda_deputies: record.agenda_deputies,
            agenda_senate: record.agenda_senate,
            agenda_date: record.agenda_date,
            links: record.links,
            publication: record.publication,
            gazette_reference: record.gazette_reference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "id": "6514-D-2025",
            "expediente": "6514-D-2025",
            "tipo_expediente": "Information Request",
            "cámara": "Diputados",
            "estado": "Submitted",
            "fecha_ingreso": "2025-09-12",
            "autores": ["PÉREZ, JUAN"],
            "bloque": ["UCR"],
            "provincias": ["CÓRDOBA"],
            "derivaciones": [{"comision": "ASUNTOS CONSTITUCIONALES", "fecha": "2025-09-15", "estado": "Giro"}],
            "sumario": "Solicita informes sobre obras viales",
            "firmantes": [{"nombre": "PÉREZ, JUAN", "distrito": "CÓRDOBA", "bloque": "UCR", "tipo": "autor"}],
            "movimientos_internos": [{
                "id": "mov-1",
                "fecha": "2025-09-20",
                "emisor": "Mesa de entradas",
                "destino": "Despacho",
                "novedad": "Recibido"
            }],
            "OD_DIPUTADOS": "OD-826",
            "Link_EXPTE": "https://www.hcdn.gob.ar/proyectos/proyectoTP.jsp?exp=6514-D-2025",
            "TP": "TP-142"
        }"#
    }

    #[test]
    fn wire_format_parses() {
        let rec: Expediente = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(rec.identifier, "6514-D-2025");
        assert_eq!(rec.chamber, Chamber::Deputies);
        assert_eq!(rec.entry_date, NaiveDate::from_ymd_opt(2025, 9, 12).unwrap());
        assert!(!rec.entry_date_inferred);
        assert_eq!(rec.signatories[0].role, Some(SignatoryRole::Author));
        assert_eq!(rec.movements[0].from, "Mesa de entradas");
        assert_eq!(
            rec.links.case_document.as_deref(),
            Some("https://www.hcdn.gob.ar/proyectos/proyectoTP.jsp?exp=6514-D-2025")
        );
        assert!(rec.links.agenda_document.is_none());
        assert_eq!(rec.publication.as_deref(), Some("TP-142"));
    }

    #[test]
    fn both_gazette_keys_are_kept() {
        let json = sample_json().replace(
            "\"TP\": \"TP-142\"",
            "\"TP\": \"142\", \"tramite_parlamentario\": \"TP-142\"",
        );
        let rec: Expediente = serde_json::from_str(&json).unwrap();
        assert_eq!(rec.publication.as_deref(), Some("142"));
        assert_eq!(rec.gazette_reference.as_deref(), Some("TP-142"));

        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["TP"], "142");
        assert_eq!(value["tramite_parlamentario"], "TP-142");
        let back: Expediente = serde_json::from_value(value).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn optional_fields_are_omitted_on_write() {
        let rec: Expediente = serde_json::from_str(sample_json()).unwrap();
        let value = serde_json::to_value(&rec).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("cámara"));
        assert!(obj.contains_key("Link_EXPTE"));
        assert!(!obj.contains_key("Link_OD"));
        assert!(!obj.contains_key("extracto"));
        assert!(!obj.contains_key("fecha_ingreso_inferida"));
        assert!(!obj.contains_key("tramites"));
        assert_eq!(obj["fecha_ingreso"], "2025-09-12");
    }

    #[test]
    fn timestamp_suffix_is_accepted_on_read() {
        let json = sample_json().replace("\"2025-09-12\"", "\"2025-09-12T00:00:00\"");
        let rec: Expediente = serde_json::from_str(&json).unwrap();
        assert_eq!(rec.entry_date, NaiveDate::from_ymd_opt(2025, 9, 12).unwrap());
    }

    #[test]
    fn unparseable_entry_date_is_an_error() {
        let json = sample_json().replace("\"2025-09-12\"", "\"sometime\"");
        assert!(serde_json::from_str::<Expediente>(&json).is_err());
    }

    #[test]
    fn chamber_labels() {
        assert_eq!(Chamber::from_label("Diputados"), Some(Chamber::Deputies));
        assert_eq!(Chamber::from_label(" senado "), Some(Chamber::Senate));
        assert_eq!(Chamber::from_label("Cámara de Senadores"), Some(Chamber::Senate));
        assert_eq!(Chamber::from_label("S"), Some(Chamber::Senate));
        assert_eq!(Chamber::from_label("HCDN"), Some(Chamber::Deputies));
        assert_eq!(Chamber::from_label("Ejecutivo"), None);
        assert_eq!(Chamber::from_label(""), None);
    }

    #[test]
    fn agenda_and_committee_flags() {
        let mut rec: Expediente = serde_json::from_str(sample_json()).unwrap();
        assert!(rec.has_agenda());
        assert!(rec.in_committee());
        rec.agenda_deputies = Some("  ".into());
        rec.referrals.clear();
        rec.status = "En Comisión".into();
        assert!(!rec.has_agenda());
        assert!(rec.in_committee());
    }

    #[test]
    fn canonical_to_partial_keeps_everything() {
        let rec: Expediente = serde_json::from_str(sample_json()).unwrap();
        let partial = PartialRecord::from(rec.clone());
        assert_eq!(partial.id.as_deref(), Some("6514-D-2025"));
        assert_eq!(partial.status.as_deref(), Some("Submitted"));
        assert_eq!(partial.movements, rec.movements);
        assert_eq!(partial.signatories, rec.signatories);
    }
}
