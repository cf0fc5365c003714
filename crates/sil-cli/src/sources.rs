//! Reading source files into tagged raw rows.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, bail};
use calamine::{Data, Reader};
use serde_json::{Number, Value};
use sil_core::{RawRow, SourceKind, SourceRow};
use tracing::{info, warn};

/// `kind=path` as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArg {
    pub kind: SourceKind,
    pub path: PathBuf,
}

impl FromStr for SourceArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let Some((kind, path)) = s.split_once('=') else {
            bail!("expected KIND=PATH, got {s:?}");
        };
        if path.trim().is_empty() {
            bail!("missing path in {s:?}");
        }
        Ok(Self {
            kind: kind.trim().parse()?,
            path: PathBuf::from(path.trim()),
        })
    }
}

/// Read every source in order into one row list.
pub fn read_sources(args: &[SourceArg]) -> anyhow::Result<Vec<RawRow>> {
    let mut rows = Vec::new();
    for arg in args {
        let before = rows.len();
        rows.extend(
            read_rows(&arg.path)?
                .into_iter()
                .map(|row| RawRow::new(arg.kind, row)),
        );
        info!(kind = %arg.kind, path = %arg.path.display(), rows = rows.len() - before, "read source");
    }
    Ok(rows)
}

/// `.csv`, `.xlsx` and `.xls` files are read with a header row; anything
/// else as a JSON array.
pub fn read_rows(path: &Path) -> anyhow::Result<Vec<SourceRow>> {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => read_csv(path),
        "xlsx" | "xls" => read_excel(path),
        _ => read_json(path),
    }
}

fn read_json(path: &Path) -> anyhow::Result<Vec<SourceRow>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))?;
    let Value::Array(items) = value else {
        bail!("{} is not a JSON array", path.display());
    };

    let mut rows = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(row) => rows.push(row),
            other => warn!(path = %path.display(), index = i, kind = json_kind(&other), "skipping non-object row"),
        }
    }
    Ok(rows)
}

fn read_csv(path: &Path) -> anyhow::Result<Vec<SourceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = rdr
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .clone();

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("{} row {}", path.display(), i + 1))?;
        let row: SourceRow = headers
            .iter()
            .zip(record.iter())
            .filter(|(h, _)| !h.is_empty())
            .map(|(h, v)| (h.to_string(), Value::String(v.to_string())))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// First worksheet, first row as header. Empty cells are left out of the row.
fn read_excel(path: &Path) -> anyhow::Result<Vec<SourceRow>> {
    let mut workbook =
        calamine::open_workbook_auto(path).with_context(|| format!("opening {}", path.display()))?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        bail!("{} has no worksheets", path.display());
    };
    let range = range.with_context(|| format!("reading {}", path.display()))?;

    let mut lines = range.rows();
    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header.iter().map(|c| c.to_string().trim().to_string()).collect();

    let mut rows = Vec::new();
    for cells in lines {
        let row: SourceRow = headers
            .iter()
            .zip(cells)
            .filter(|(h, _)| !h.is_empty())
            .filter_map(|(h, cell)| cell_value(cell).map(|v| (h.clone(), v)))
            .collect();
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Dates stay spreadsheet serials; whole floats become integers.
fn cell_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(Value::String(s.trim().to_string())),
        Data::Int(i) => Some(Value::from(*i)),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(Value::from(*f as i64)),
        Data::Float(f) => Number::from_f64(*f).map(Value::Number),
        Data::Bool(b) => Some(Value::Bool(*b)),
        Data::DateTime(dt) => Number::from_f64(dt.as_f64()).map(Value::Number),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Value::String(s.clone())),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
