//! Column alias tables, one per source kind.
//!
//! Each entry lists the candidate key spellings for one canonical field, most
//! specific first. The extractor walks these tables; nothing else in the crate
//! knows what a source calls its columns.

use crate::extract::SourceKind;

/// Canonical fields a source row can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Identifier,
    DeputiesIdentifier,
    SenateIdentifier,
    Sequence,
    Origin,
    Year,
    Chamber,
    CaseType,
    Status,
    EntryDate,
    Authors,
    /// "Author: summary" composite.
    Title,
    Summary,
    Abstract,
    Blocs,
    Provinces,
    Signatories,
    Procedures,
    Referrals,
    Committee,
    CommitteeDate,
    Reports,
    /// Agenda number whose chamber is decided by the record's chamber.
    Agenda,
    AgendaDeputies,
    AgendaSenate,
    AgendaDate,
    CaseLink,
    AgendaLink,
    Publication,
}

pub struct AliasTable {
    entries: &'static [(Field, &'static [&'static str])],
}

impl AliasTable {
    pub fn for_kind(kind: SourceKind) -> &'static AliasTable {
        match kind {
            SourceKind::Api => &API,
            SourceKind::HtmlDetail => &HTML_DETAIL,
            SourceKind::Csv => &CSV,
            SourceKind::Spreadsheet => &SPREADSHEET,
        }
    }

    pub fn aliases(&self, field: Field) -> &'static [&'static str] {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[])
    }
}

// ── Open-data API (datastore rows) ──

static API: AliasTable = AliasTable {
    entries: &[
        (Field::Identifier, &["expediente", "Expediente"]),
        (Field::DeputiesIdentifier, &["Exp. Diputados", "exp_diputados"]),
        (Field::SenateIdentifier, &["Exp. Senado", "exp_senado"]),
        (Field::Sequence, &["numero", "número"]),
        (Field::Origin, &["origen"]),
        (Field::Year, &["anio", "año"]),
        (Field::Chamber, &["Cámara Origen", "camara_origen", "cámara", "camara"]),
        (Field::CaseType, &["tipo_expediente", "Tipo", "tipo"]),
        (Field::Status, &["estado"]),
        (Field::EntryDate, &["fecha_ingreso", "Publicación Fecha", "publicacion_fecha", "fecha"]),
        (Field::Authors, &["autores", "autor"]),
        (Field::Title, &["Título", "titulo", "title"]),
        (Field::Summary, &["sumario"]),
        (Field::Abstract, &["extracto"]),
        (Field::Blocs, &["bloque", "bloques"]),
        (Field::Provinces, &["provincias", "provincia", "distrito"]),
        (Field::Signatories, &["firmantes"]),
        (Field::Procedures, &["tramites", "trámites"]),
        (Field::Referrals, &["derivaciones"]),
        (Field::Committee, &["comisiones", "giro"]),
        (Field::Reports, &["dictamenes", "dictámenes"]),
        (Field::AgendaDeputies, &["OD_DIPUTADOS"]),
        (Field::AgendaSenate, &["OD_SENADO"]),
        (Field::AgendaDate, &["Fecha_OD"]),
        (Field::CaseLink, &["Link_EXPTE", "url_expediente"]),
        (Field::AgendaLink, &["Link_OD"]),
        (Field::Publication, &["Publicación ID", "publicacion_id", "TP"]),
    ],
};

// ── Scraped detail pages ──

static HTML_DETAIL: AliasTable = AliasTable {
    entries: &[
        (Field::Identifier, &["expediente", "Expediente N°", "Expediente"]),
        (Field::Chamber, &["cámara", "camara", "Cámara de origen"]),
        (Field::CaseType, &["tipo_proyecto", "tipo", "Tipo de proyecto"]),
        (Field::Status, &["estado"]),
        (Field::EntryDate, &["fecha", "Fecha:", "Fecha de ingreso"]),
        (Field::Authors, &["autores"]),
        (Field::Summary, &["sumario", "Sumario:"]),
        (Field::Abstract, &["extracto"]),
        (Field::Blocs, &["bloque"]),
        (Field::Provinces, &["provincias"]),
        (Field::Signatories, &["firmantes"]),
        (Field::Procedures, &["tramites", "trámites", "movimientos"]),
        (Field::Referrals, &["derivaciones"]),
        (Field::Committee, &["comisiones", "giro"]),
        (Field::Reports, &["dictamenes", "dictámenes"]),
        (Field::CaseLink, &["Link_EXPTE", "url"]),
        (Field::Publication, &["Trámite Parlamentario", "tramite_parlamentario", "TP", "Publicado en"]),
    ],
};

// ── Bulk CSV downloads ──

static CSV: AliasTable = AliasTable {
    entries: &[
        (Field::Identifier, &["expediente", "Expediente"]),
        (Field::DeputiesIdentifier, &["exp_diputados", "Exp. Diputados"]),
        (Field::SenateIdentifier, &["exp_senado", "Exp. Senado"]),
        (Field::Chamber, &["camara_origen", "Cámara Origen"]),
        (Field::CaseType, &["tipo", "Tipo"]),
        (Field::Status, &["estado"]),
        (Field::EntryDate, &["publicacion_fecha", "Publicación Fecha", "fecha"]),
        (Field::Authors, &["autor", "Autor"]),
        (Field::Title, &["titulo", "Título"]),
        (Field::Summary, &["sumario"]),
        (Field::Publication, &["publicacion_id", "Publicación ID"]),
    ],
};

// ── Manual spreadsheet imports ──

static SPREADSHEET: AliasTable = AliasTable {
    entries: &[
        (Field::Identifier, &["Expediente", "N° Exp.", "Expte", "Nro Expediente"]),
        (Field::Chamber, &["Camara", "Cámara", "Origen"]),
        (Field::CaseType, &["Tipo", "Tipo Proyecto"]),
        (Field::Status, &["Estado", "Estado Parlamentario", "Situación"]),
        (Field::EntryDate, &["Fecha", "Fecha Ingreso", "Fecha Presentacion", "F. Dictamen", "FECHA OD"]),
        (Field::Authors, &["Autor", "Autores", "Firmantes", "Firmante", "Iniciador"]),
        (Field::Summary, &["Sumario", "Extracto", "Tema", "Asunto", "Titulo", "Carátula"]),
        (Field::Blocs, &["Bloque", "Bloques"]),
        (Field::Provinces, &["Provincia", "Provincias", "Distrito"]),
        (Field::Committee, &["COMISION", "Comisión", "Giro"]),
        (Field::CommitteeDate, &["Fecha Giro", "Fecha Comisión"]),
        (Field::Agenda, &["OD", "Orden del Día", "N° OD"]),
        (Field::AgendaDate, &["Fecha OD", "Fecha_OD"]),
        (Field::CaseLink, &["Link Expte", "Url Expte", "Enlace Expte", "Link_EXPTE"]),
        (Field::AgendaLink, &["Link OD", "Url OD", "Enlace OD", "Link_OD"]),
    ],
};
