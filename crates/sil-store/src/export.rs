//! Flat CSV, Excel and pretty JSON exports of a record selection.

use std::io::Write;

use rust_xlsxwriter::{Format, Workbook};
use sil_core::{Expediente, dates};

use crate::StoreError;

pub const CSV_HEADER: [&str; 15] = [
    "ID",
    "Expediente",
    "Cámara",
    "Tipo",
    "Estado",
    "Fecha Ingreso",
    "Sumario",
    "Autores",
    "Bloque",
    "Provincias",
    "Comisiones",
    "OD Diputados",
    "OD Senado",
    "Link Expediente",
    "Link OD",
];

pub const SHEET_NAME: &str = "Expedientes";

/// The [`CSV_HEADER`] columns of one record. List columns are joined with `", "`.
fn flat_row(r: &Expediente) -> [String; 15] {
    let committees: Vec<&str> = r.referrals.iter().map(|d| d.committee.as_str()).collect();
    let optional = |v: &Option<String>| v.clone().unwrap_or_default();
    [
        r.id.clone(),
        r.identifier.clone(),
        r.chamber.as_str().to_string(),
        r.case_type.clone(),
        r.status.clone(),
        dates::to_iso(r.entry_date),
        r.summary.clone(),
        r.authors.join(", "),
        r.blocs.join(", "),
        r.provinces.join(", "),
        committees.join(", "),
        optional(&r.agenda_deputies),
        optional(&r.agenda_senate),
        optional(&r.links.case_document),
        optional(&r.links.agenda_document),
    ]
}

/// One row per record.
pub fn write_csv<W: Write>(records: &[&Expediente], writer: W) -> Result<(), StoreError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for r in records {
        wtr.write_record(flat_row(r))?;
    }
    wtr.flush().map_err(|e| StoreError::Csv(e.into()))?;
    Ok(())
}

/// Single-sheet `.xlsx` workbook with the same columns as the CSV export.
pub fn write_xlsx<W: Write>(records: &[&Expediente], mut writer: W) -> Result<(), StoreError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    for (col, title) in (0u16..).zip(CSV_HEADER) {
        sheet.write_string_with_format(0, col, title, &bold)?;
    }
    for (row, r) in (1u32..).zip(records) {
        for (col, value) in (0u16..).zip(flat_row(r)) {
            if !value.is_empty() {
                sheet.write_string(row, col, value)?;
            }
        }
    }
    sheet.set_freeze_panes(1, 0)?;
    sheet.autofit();

    let bytes = workbook.save_to_buffer()?;
    writer
        .write_all(&bytes)
        .map_err(|e| StoreError::io("<export>", e))?;
    Ok(())
}

/// Pretty JSON array in the stored wire format.
pub fn write_json<W: Write>(records: &[&Expediente], mut writer: W) -> Result<(), StoreError> {
    serde_json::to_writer_pretty(&mut writer, records)
        .map_err(|e| StoreError::json("<export>", e))?;
    writer
        .write_all(b"\n")
        .map_err(|e| StoreError::io("<export>", e))?;
    Ok(())
}
