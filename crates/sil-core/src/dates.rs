//! Date parsing for the formats upstream sources emit.

use chrono::{Days, NaiveDate};
use serde_json::Value;

/// Day zero of spreadsheet serial dates.
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Largest serial a spreadsheet will produce (9999-12-31).
const MAX_SERIAL: f64 = 2_958_465.0;

/// Smallest serial read from a data cell (1980-01-01). Smaller numbers in a
/// date column are years, counts or sequence numbers.
const MIN_CELL_SERIAL: f64 = 29_221.0;

/// Parse `YYYY-MM-DD` (with an optional time suffix) or `DD/MM/YYYY`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let date_part = s.split(['T', ' ']).next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%d/%m/%Y"))
        .ok()
}

/// Convert a spreadsheet serial number (days since 1899-12-30).
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(Days::new(serial.floor() as u64))
}

/// Parse a date out of a JSON cell: text in any supported format, or a
/// numeric serial from 1980 on.
pub fn from_value(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date(s),
        Value::Number(n) => n.as_f64().and_then(cell_serial),
        _ => None,
    }
}

/// Like [`from_value`], but also reads serials kept as text, which
/// spreadsheet exports produce.
pub fn from_spreadsheet_value(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date(s)
            .or_else(|| s.trim().parse::<f64>().ok().and_then(cell_serial)),
        other => from_value(other),
    }
}

fn cell_serial(serial: f64) -> Option<NaiveDate> {
    (serial >= MIN_CELL_SERIAL).then(|| from_serial(serial)).flatten()
}

/// Render as ISO `YYYY-MM-DD`.
pub fn to_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Serde adapter for ISO dates that also tolerates the time suffix and
/// `DD/MM/YYYY` spellings found in older data files.
pub mod iso {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_iso(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw)
            .ok_or_else(|| de::Error::custom(format!("unrecognised date {raw:?}")))
    }
}
