//! Case number parsing.
//!
//! Upstream sources spell the same case in several ways:
//!
//! - `6514-D-2025`  Deputies open-data API and detail pages
//! - `577-S-2025`   Senate-origin cases listed by Deputies
//! - `S-1930/2025`  Senate agenda listings
//! - `S-577/25`     Senate agenda listings, short year
//! - `0001-PL-25`   Senate project pages, type code in place of the chamber
//!
//! All of them carry a sequence number; most also carry a chamber code and a
//! year. [`canonicalize`] folds these spellings into `{sequence}-{code}-{year}`
//! with the sequence written without leading zeros. Strings that only loosely
//! look like a case number (extra numbers, unknown codes) are kept as given so
//! that two different cases never share a key.

use std::fmt;

use thiserror::Error;

use crate::record::Chamber;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("no sequence number in identifier {0:?}")]
    NoSequence(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChamberCode {
    D,
    S,
    /// Historical Deputies code.
    P,
    /// Senate project type prefixes: bill, resolution, communication,
    /// declaration. Each type is numbered separately.
    PL,
    PR,
    PC,
    PD,
}

impl ChamberCode {
    pub fn chamber(self) -> Chamber {
        match self {
            Self::D | Self::P => Chamber::Deputies,
            Self::S | Self::PL | Self::PR | Self::PC | Self::PD => Chamber::Senate,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::D => "D",
            Self::S => "S",
            Self::P => "P",
            Self::PL => "PL",
            Self::PR => "PR",
            Self::PC => "PC",
            Self::PD => "PD",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "D" => Some(Self::D),
            "S" => Some(Self::S),
            "P" => Some(Self::P),
            "PL" => Some(Self::PL),
            "PR" => Some(Self::PR),
            "PC" => Some(Self::PC),
            "PD" => Some(Self::PD),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaseNumber {
    pub sequence: u32,
    pub code: Option<ChamberCode>,
    pub year: Option<u16>,
}

impl CaseNumber {
    pub fn chamber(&self) -> Option<Chamber> {
        self.code.map(ChamberCode::chamber)
    }

    /// `{sequence}-{code}-{year}`, when both code and year are known.
    pub fn canonical(&self) -> Option<String> {
        let code = self.code?;
        let year = self.year?;
        Some(format!("{}-{}-{year}", self.sequence, code.as_str()))
    }
}

impl fmt::Display for CaseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical() {
            Some(c) => f.write_str(&c),
            None => write!(f, "{}", self.sequence),
        }
    }
}

/// Parse a free-form identifier.
///
/// The sequence is the first digit run, whatever precedes it. The year is the
/// last digit run after that one. The chamber code is the first purely
/// alphabetic token that names one.
pub fn parse(raw: &str) -> Result<CaseNumber, ParseFailure> {
    let upper = raw.trim().to_uppercase();
    let runs = digit_runs(&upper);
    let Some(first) = runs.first() else {
        return Err(ParseFailure::NoSequence(raw.to_string()));
    };

    // Absurdly long runs saturate instead of failing.
    let sequence = first.parse::<u32>().unwrap_or(u32::MAX);
    let year = runs.iter().skip(1).last().and_then(|run| read_year(run));
    let code = upper
        .split(|c: char| !c.is_alphanumeric())
        .filter(|tok| !tok.is_empty() && tok.chars().all(|c| c.is_ascii_alphabetic()))
        .find_map(ChamberCode::from_token);

    Ok(CaseNumber { sequence, code, year })
}

/// Parse only the accepted spellings: `{seq}-{code}-{year}` or
/// `{code}-{seq}/{year}`, optionally after leading words such as "Expte.".
///
/// Anything else, including strings with more than two numbers, is `None`.
pub fn parse_exact(raw: &str) -> Option<CaseNumber> {
    let upper = raw.trim().to_uppercase();
    let tokens: Vec<&str> = upper
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    let start = tokens
        .iter()
        .position(|t| !is_word(t) || ChamberCode::from_token(t).is_some())?;
    let (code, seq, year) = match tokens[start..] {
        [seq, code, year] if is_number(seq) && is_number(year) => (code, seq, year),
        [code, seq, year] if is_number(seq) && is_number(year) => (code, seq, year),
        _ => return None,
    };
    Some(CaseNumber {
        sequence: seq.parse().ok()?,
        code: Some(ChamberCode::from_token(code)?),
        year: Some(read_year(year)?),
    })
}

/// Canonical spelling for the accepted formats, else the trimmed input.
pub fn canonicalize(raw: &str) -> String {
    parse_exact(raw)
        .and_then(|n| n.canonical())
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Sequence number, 0 when there is none.
pub fn sequence_of(raw: &str) -> u32 {
    parse(raw).map(|n| n.sequence).unwrap_or(0)
}

/// Chamber named by the identifier's code, if any.
pub fn chamber_of(raw: &str) -> Option<Chamber> {
    parse(raw).ok().and_then(|n| n.chamber())
}

fn digit_runs(s: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, c) in s.char_indices() {
        match (c.is_ascii_digit(), start) {
            (true, None) => start = Some(i),
            (false, Some(st)) => {
                runs.push(&s[st..i]);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(st) = start {
        runs.push(&s[st..]);
    }
    runs
}

fn is_word(token: &str) -> bool {
    token.chars().all(|c| c.is_ascii_alphabetic())
}

fn is_number(token: &str) -> bool {
    token.chars().all(|c| c.is_ascii_digit())
}

fn read_year(run: &str) -> Option<u16> {
    match run.len() {
        2 => run.parse::<u16>().ok().map(|yy| 2000 + yy),
        4 => run.parse().ok(),
        _ => None,
    }
}
