//! Field extraction: one raw source row in, one [`PartialRecord`] out.
//!
//! Column names are looked up through the per-kind [`AliasTable`]. For each
//! canonical field the resolution order is:
//!
//! 1. exact key match, aliases in table order
//! 2. case-insensitive key match
//! 3. first row key (in row order) containing an alias as a case-insensitive
//!    substring; aliases shorter than four characters never substring-match
//! 4. the field default, logged as an extraction gap
//!
//! `null`, `""` and `"NA"` cells count as absent at every step.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::aliases::{AliasTable, Field};
use crate::dates;
use crate::identifier;
use crate::record::{
    Chamber, CommitteeReferral, CommitteeReport, MAX_AUTHORS, PartialRecord, ProcedureStep,
    Signatory, SignatoryRole, UNKNOWN_LEGISLATOR,
};

/// Case type given when nothing better is known. Also the normalized form of
/// every "pedido de informes".
pub const DEFAULT_CASE_TYPE: &str = "Information Request";

pub const CASE_TYPES: [&str; 5] = [
    "Information Request",
    "Bill",
    "Resolution",
    "Communication",
    "Declaration",
];

pub const REFERRED_TO_COMMITTEE: &str = "Referred to committee";
pub const ON_AGENDA: &str = "On Agenda";

const MIN_SUBSTRING_ALIAS: usize = 4;

// ── Source rows ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    Api,
    HtmlDetail,
    Csv,
    Spreadsheet,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::HtmlDetail => "htmlDetail",
            Self::Csv => "csv",
            Self::Spreadsheet => "spreadsheet",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown source kind {0:?} (expected api, htmlDetail, csv or spreadsheet)")]
pub struct UnknownSourceKind(pub String);

impl FromStr for SourceKind {
    type Err = UnknownSourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "api" => Ok(Self::Api),
            "htmldetail" | "html-detail" | "html" | "detail" => Ok(Self::HtmlDetail),
            "csv" => Ok(Self::Csv),
            "spreadsheet" | "sheet" | "xlsx" => Ok(Self::Spreadsheet),
            _ => Err(UnknownSourceKind(s.to_string())),
        }
    }
}

/// A decoded source row. Key order is the column order of the source.
pub type SourceRow = Map<String, Value>;

/// A source row tagged with the kind of source it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub kind: SourceKind,
    pub row: SourceRow,
}

impl RawRow {
    pub fn new(kind: SourceKind, row: SourceRow) -> Self {
        Self { kind, row }
    }
}

// ── Extractor ──

/// Maps source rows onto partial records. Carries the day used for defaulted
/// entry dates.
#[derive(Debug, Clone, Copy)]
pub struct FieldExtractor {
    today: NaiveDate,
}

impl FieldExtractor {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn extract_raw(&self, raw: &RawRow) -> Option<PartialRecord> {
        self.extract(&raw.row, raw.kind)
    }

    /// Build a partial record from one row. `None` when the row carries no
    /// identifier at all.
    pub fn extract(&self, row: &SourceRow, kind: SourceKind) -> Option<PartialRecord> {
        let view = RowView {
            row,
            table: AliasTable::for_kind(kind),
        };

        let declared = view
            .text(Field::Chamber)
            .and_then(|label| Chamber::from_label(&label))
            .or_else(|| {
                view.text(Field::Origin)
                    .and_then(|label| Chamber::from_label(&label))
            });

        let Some(case_id) = resolve_identifier(&view, declared) else {
            warn!(kind = kind.as_str(), columns = row.len(), "row has no identifier, skipped");
            return None;
        };
        let gap = |field: Field| {
            debug!(identifier = %case_id, kind = kind.as_str(), ?field, "extraction gap, default applied");
        };

        let mut partial = PartialRecord::new(case_id.clone(), self.today);
        partial.source = Some(kind);
        let derived = identifier::chamber_of(&case_id);
        partial.chamber = declared.or(derived);

        // Summary and authors, explicit columns before the composite title.
        let (title_authors, title_summary) = view
            .text(Field::Title)
            .map(|t| split_composite(&t))
            .unwrap_or_default();
        match view.text(Field::Summary).or(title_summary) {
            Some(summary) => partial.summary = summary,
            None => gap(Field::Summary),
        }
        partial.abstract_text = view.text(Field::Abstract);

        let authors = view.value(Field::Authors).map(author_list).unwrap_or_default();
        if !authors.is_empty() {
            partial.authors = authors;
        } else if !title_authors.is_empty() {
            partial.authors = title_authors;
        } else {
            gap(Field::Authors);
            partial.authors = vec![UNKNOWN_LEGISLATOR.to_string()];
        }

        partial.signatories = view.value(Field::Signatories).map(signatories).unwrap_or_default();
        partial.blocs = view.value(Field::Blocs).map(list_values).unwrap_or_default();
        partial.provinces = view.value(Field::Provinces).map(list_values).unwrap_or_default();

        // Case type.
        let mut case_type = view
            .text(Field::CaseType)
            .map(|t| normalize_case_type(&t))
            .or_else(|| infer_case_type(&partial.summary));
        if mentions_information_request(&partial.summary) {
            case_type = Some(DEFAULT_CASE_TYPE.to_string());
        }
        match case_type {
            Some(t) => partial.case_type = t,
            None => gap(Field::CaseType),
        }

        let read_date: fn(&Value) -> Option<NaiveDate> = match kind {
            SourceKind::Spreadsheet => dates::from_spreadsheet_value,
            _ => dates::from_value,
        };
        match view.value(Field::EntryDate).and_then(read_date) {
            Some(date) => {
                partial.entry_date = date;
                partial.entry_date_inferred = false;
            }
            None => gap(Field::EntryDate),
        }

        // Structured arrays.
        partial.procedures = view.value(Field::Procedures).map(procedures).unwrap_or_default();
        partial.reports = view.value(Field::Reports).map(reports).unwrap_or_default();
        partial.referrals = view.value(Field::Referrals).map(referrals).unwrap_or_default();
        if partial.referrals.is_empty()
            && let Some(committees) = view.value(Field::Committee)
        {
            let date = view
                .value(Field::CommitteeDate)
                .and_then(read_date)
                .or((!partial.entry_date_inferred).then_some(partial.entry_date))
                .map(dates::to_iso)
                .unwrap_or_default();
            partial.referrals = committee_names(committees)
                .into_iter()
                .map(|committee| CommitteeReferral {
                    committee,
                    date: date.clone(),
                    status: REFERRED_TO_COMMITTEE.to_string(),
                })
                .collect();
        }

        // Agenda references.
        partial.agenda_deputies = view.text(Field::AgendaDeputies);
        partial.agenda_senate = view.text(Field::AgendaSenate);
        if let Some(agenda) = view.text(Field::Agenda) {
            let slot = match derived.or(declared).unwrap_or(Chamber::Deputies) {
                Chamber::Deputies => &mut partial.agenda_deputies,
                Chamber::Senate => &mut partial.agenda_senate,
            };
            slot.get_or_insert(agenda);
        }
        partial.agenda_date = view
            .value(Field::AgendaDate)
            .and_then(|v| read_date(v).map(dates::to_iso).or_else(|| text(v)));

        partial.status = view.text(Field::Status);
        let on_agenda = partial.agenda_deputies.is_some() || partial.agenda_senate.is_some();
        if partial.status.is_none() && kind == SourceKind::Spreadsheet && on_agenda {
            partial.status = Some(ON_AGENDA.to_string());
        }

        partial.links.case_document = view.text(Field::CaseLink);
        partial.links.agenda_document = view.text(Field::AgendaLink);
        partial.publication = view.text(Field::Publication);

        Some(partial)
    }
}

// ── Alias resolution ──

struct RowView<'r> {
    row: &'r SourceRow,
    table: &'static AliasTable,
}

impl<'r> RowView<'r> {
    fn value(&self, field: Field) -> Option<&'r Value> {
        resolve(self.row, self.table.aliases(field))
    }

    fn text(&self, field: Field) -> Option<String> {
        self.value(field).and_then(text)
    }
}

/// Find the cell for a list of aliases. See the module docs for the order.
pub fn resolve<'r>(row: &'r SourceRow, aliases: &[&str]) -> Option<&'r Value> {
    if let Some(v) = aliases.iter().filter_map(|a| row.get(*a)).find(|v| is_present(v)) {
        return Some(v);
    }

    let lowered: Vec<String> = aliases.iter().map(|a| a.to_lowercase()).collect();
    for alias in &lowered {
        let hit = row
            .iter()
            .find(|(k, v)| k.to_lowercase() == *alias && is_present(v));
        if let Some((_, v)) = hit {
            return Some(v);
        }
    }

    for alias in lowered.iter().filter(|a| a.chars().count() >= MIN_SUBSTRING_ALIAS) {
        let hit = row
            .iter()
            .find(|(k, v)| k.to_lowercase().contains(alias.as_str()) && is_present(v));
        if let Some((_, v)) = hit {
            return Some(v);
        }
    }
    None
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => {
            let s = s.trim();
            !s.is_empty() && s != "NA"
        }
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Scalar cell as trimmed text. Whole floats lose their `.0`.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && s != "NA").then(|| s.to_string())
        }
        Value::Number(n) => Some(match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        }),
        _ => None,
    }
}

fn object_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| obj.get(*k).and_then(text))
}

// ── Identifier ──

fn resolve_identifier(view: &RowView<'_>, declared: Option<Chamber>) -> Option<String> {
    let chamber_specific = match declared {
        Some(Chamber::Senate) => [Field::SenateIdentifier, Field::DeputiesIdentifier],
        _ => [Field::DeputiesIdentifier, Field::SenateIdentifier],
    };
    let raw = view
        .text(Field::Identifier)
        .or_else(|| chamber_specific.iter().find_map(|f| view.text(*f)))
        .or_else(|| compose_identifier(view))?;
    Some(identifier::canonicalize(&raw))
}

/// `{numero}-{origen}-{anio}` from separate columns.
fn compose_identifier(view: &RowView<'_>) -> Option<String> {
    let number = view.text(Field::Sequence)?;
    let origin = view.text(Field::Origin)?;
    let year = view.text(Field::Year)?;
    let code = match origin.trim().to_uppercase().as_str() {
        c @ ("D" | "S" | "P") => c.to_string(),
        _ => Chamber::from_label(&origin)?.code().to_string(),
    };
    Some(format!("{number}-{code}-{year}"))
}

// ── Authors and lists ──

/// Split a composite "Author: summary" field on the first colon.
pub fn split_composite(title: &str) -> (Vec<String>, Option<String>) {
    match title.split_once(':') {
        Some((left, right)) if !left.trim().is_empty() => {
            let right = right.trim();
            let summary = (!right.is_empty()).then(|| right.to_string());
            (split_authors(left), summary)
        }
        _ => {
            let title = title.trim();
            (Vec::new(), (!title.is_empty()).then(|| title.to_string()))
        }
    }
}

/// Split an author cell into names.
///
/// Semicolons separate names when present. Otherwise commas do, except that
/// `SURNAME, Given` pairs are re-joined when the first fragment is a single
/// word. Capped at [`MAX_AUTHORS`].
pub fn split_authors(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    let names: Vec<String> = if raw.contains(';') {
        raw.split(';').map(str::trim).map(String::from).collect()
    } else {
        let parts: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let surname_first = parts.len() > 1 && !parts[0].contains(char::is_whitespace);
        if surname_first {
            parts.chunks(2).map(|pair| pair.join(", ")).collect()
        } else {
            parts.into_iter().map(String::from).collect()
        }
    };
    let mut out = distinct(names.into_iter().filter(|n| !n.is_empty() && n != "NA"));
    out.truncate(MAX_AUTHORS);
    out
}

fn author_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => {
            let mut names = distinct(items.iter().filter_map(text));
            names.truncate(MAX_AUTHORS);
            names
        }
        other => text(other).map(|s| split_authors(&s)).unwrap_or_default(),
    }
}

/// Blocs, provinces: arrays, or one cell separated by commas or semicolons.
fn list_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => distinct(items.iter().filter_map(text)),
        other => text(other)
            .map(|s| {
                distinct(
                    s.split([',', ';'])
                        .map(str::trim)
                        .filter(|p| !p.is_empty() && *p != "NA")
                        .map(String::from),
                )
            })
            .unwrap_or_default(),
    }
}

/// Order-preserving dedup.
pub(crate) fn distinct(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

// ── Structured arrays ──

fn objects(value: &Value) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn signatories(value: &Value) -> Vec<Signatory> {
    objects(value)
        .filter_map(|obj| {
            let name = object_text(obj, &["nombre", "name", "firmante"])?;
            Some(Signatory {
                name,
                district: object_text(obj, &["distrito", "district", "provincia"]),
                bloc: object_text(obj, &["bloque", "bloc"]),
                role: object_text(obj, &["tipo", "role"]).and_then(|r| signatory_role(&r)),
            })
        })
        .enumerate()
        .map(|(i, mut s)| {
            if s.role.is_none() {
                s.role = Some(if i == 0 {
                    SignatoryRole::Author
                } else {
                    SignatoryRole::Cosigner
                });
            }
            s
        })
        .collect()
}

fn signatory_role(raw: &str) -> Option<SignatoryRole> {
    let r = raw.to_lowercase();
    if r.contains("coautor") || r.contains("cofirm") || r.contains("cosign") {
        Some(SignatoryRole::Cosigner)
    } else if r.contains("autor") || r.contains("author") {
        Some(SignatoryRole::Author)
    } else {
        None
    }
}

fn procedures(value: &Value) -> Vec<ProcedureStep> {
    objects(value)
        .filter_map(|obj| {
            Some(ProcedureStep {
                action: object_text(obj, &["movimiento", "action", "descripcion"])?,
                date: object_date(obj),
                chamber: object_text(obj, &["camara", "cámara", "chamber"]),
                result: object_text(obj, &["resultado", "result"]),
            })
        })
        .collect()
}

fn referrals(value: &Value) -> Vec<CommitteeReferral> {
    objects(value)
        .filter_map(|obj| {
            Some(CommitteeReferral {
                committee: object_text(obj, &["comision", "comisión", "committee", "nombre"])
                    .map(|c| clean_committee(&c))?,
                date: object_date(obj),
                status: object_text(obj, &["estado", "status"]).unwrap_or_default(),
            })
        })
        .collect()
}

fn reports(value: &Value) -> Vec<CommitteeReport> {
    objects(value)
        .filter_map(|obj| {
            let kind = object_text(obj, &["tipo", "kind"]);
            let description = object_text(obj, &["descripcion", "descripción", "description"]);
            if kind.is_none() && description.is_none() {
                return None;
            }
            Some(CommitteeReport {
                kind: kind.unwrap_or_else(|| "Dictamen".to_string()),
                date: object_date(obj),
                description,
            })
        })
        .collect()
}

/// Nested dates are normalized to ISO when they parse, kept verbatim otherwise.
fn object_date(obj: &Map<String, Value>) -> String {
    ["fecha", "date"]
        .iter()
        .find_map(|k| obj.get(*k))
        .and_then(|v| dates::from_value(v).map(dates::to_iso).or_else(|| text(v)))
        .unwrap_or_default()
}

/// Committee names from a list cell or a `;`/newline separated string.
fn committee_names(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(text).collect(),
        other => text(other)
            .map(|s| s.split([';', '\n']).map(String::from).collect())
            .unwrap_or_default(),
    };
    distinct(
        raw.iter()
            .map(|c| clean_committee(c))
            .filter(|c| !c.is_empty()),
    )
}

/// Drop the "(Primera Competencia)" style suffix detail pages append.
fn clean_committee(raw: &str) -> String {
    let raw = raw.trim();
    match raw.find('(') {
        Some(i) if raw[i..].to_lowercase().contains("competencia") => raw[..i].trim().to_string(),
        _ => raw.to_string(),
    }
}

// ── Case types ──

fn fold(s: &str) -> String {
    s.to_uppercase()
        .chars()
        .map(|c| match c {
            'Á' => 'A',
            'É' => 'E',
            'Í' => 'I',
            'Ó' => 'O',
            'Ú' | 'Ü' => 'U',
            other => other,
        })
        .collect()
}

/// Map a type label onto the controlled vocabulary; unknown labels pass through.
pub fn normalize_case_type(raw: &str) -> String {
    let folded = fold(raw.trim());
    let canonical = match folded.as_str() {
        "PL" => Some("Bill"),
        "PR" => Some("Resolution"),
        "PC" => Some("Communication"),
        "PD" => Some("Declaration"),
        f if f.contains("INFORM") => Some(DEFAULT_CASE_TYPE),
        f if f.contains("LEY") || f.contains("BILL") => Some("Bill"),
        f if f.contains("RESOL") => Some("Resolution"),
        f if f.contains("DECLAR") => Some("Declaration"),
        f if f.contains("COMUN") || f.contains("COMMUN") => Some("Communication"),
        _ => None,
    };
    canonical
        .map(str::to_string)
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Type named inside a summary ("Proyecto de ley ...").
fn infer_case_type(summary: &str) -> Option<String> {
    let folded = fold(summary);
    [
        ("PROYECTO DE LEY", "Bill"),
        ("PROYECTO DE RESOLUCION", "Resolution"),
        ("PROYECTO DE COMUNICACION", "Communication"),
        ("PROYECTO DE DECLARACION", "Declaration"),
    ]
    .iter()
    .find(|(phrase, _)| folded.contains(phrase))
    .map(|(_, t)| t.to_string())
}

fn mentions_information_request(summary: &str) -> bool {
    fold(summary).contains("PEDIDO DE INFORME")
}
