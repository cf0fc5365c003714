//! Terminal rendering for case records.
//!
//! A record prints as a vertical card grouped by section; listings print one
//! line per record.

use sil_core::{Expediente, RunStats, SignatoryRole, dates};
use sil_store::{BackupInfo, Stats};

const MAX_LIST_ITEMS: usize = 10;

// ── Public API ──

/// Print a single record as a vertical card.
pub fn print_card(r: &Expediente) {
    println!("=== {} ===", r.identifier);
    println!("{}", r.summary);
    println!();

    let entry = if r.entry_date_inferred {
        format!("{} (inferred)", dates::to_iso(r.entry_date))
    } else {
        dates::to_iso(r.entry_date)
    };
    print_section(
        "Identity",
        &[
            ("id", Some(r.id.clone())),
            ("chamber", Some(r.chamber.to_string())),
            ("case type", Some(r.case_type.clone())),
            ("status", Some(r.status.clone())),
            ("entry date", Some(entry)),
            ("publication", r.publication.clone()),
        ],
    );
    print_section(
        "Authorship",
        &[
            ("authors", joined(&r.authors)),
            ("blocs", joined(&r.blocs)),
            ("provinces", joined(&r.provinces)),
        ],
    );
    print_section("Abstract", &[("abstract", r.abstract_text.clone())]);
    print_section(
        "Agenda",
        &[
            ("order (Diputados)", r.agenda_deputies.clone()),
            ("order (Senado)", r.agenda_senate.clone()),
            ("order date", r.agenda_date.clone()),
        ],
    );
    print_section(
        "Links",
        &[
            ("case document", r.links.case_document.clone()),
            ("agenda document", r.links.agenda_document.clone()),
        ],
    );

    print_list(
        "Signatories",
        r.signatories.iter().map(|s| {
            let mut line = format!("{:<30}", s.name);
            match s.role {
                Some(SignatoryRole::Author) => line.push_str("  author"),
                Some(SignatoryRole::Cosigner) => line.push_str("  co-signer"),
                None => {}
            }
            for extra in [&s.bloc, &s.district].into_iter().flatten() {
                line.push_str(&format!("  {extra}"));
            }
            line
        }),
    );
    print_list(
        "Committee referrals",
        r.referrals
            .iter()
            .map(|d| format!("{:<40}  {}  {}", shorten(&d.committee, 40), d.date, d.status)),
    );
    print_list(
        "Procedure",
        r.procedures.iter().map(|p| {
            let mut line = format!("{:<12}", p.date);
            if let Some(chamber) = &p.chamber {
                line.push_str(&format!("  {chamber}"));
            }
            line.push_str(&format!("  {}", shorten(&p.action, 60)));
            if let Some(result) = &p.result {
                line.push_str(&format!("  [{result}]"));
            }
            line
        }),
    );
    print_list(
        "Committee reports",
        r.reports
            .iter()
            .map(|d| format!("{:<12}  {}", d.date, d.kind)),
    );
    print_list(
        "Internal movements",
        r.movements.iter().map(|m| {
            format!(
                "{:<12}  {} -> {}  {}",
                m.date,
                m.from,
                m.to,
                shorten(&m.note, 50)
            )
        }),
    );
}

/// One line per record: identifier, chamber, date, type, summary.
pub fn print_rows<'a>(records: impl IntoIterator<Item = &'a Expediente>) {
    let mut count = 0;
    for r in records {
        println!(
            "{:<16} {:<10} {}  {:<22} {}",
            r.identifier,
            r.chamber.as_str(),
            dates::to_iso(r.entry_date),
            shorten(&r.case_type, 22),
            shorten(&r.summary, 70)
        );
        count += 1;
    }
    println!("\n{count} record(s)");
}

pub fn print_run_stats(s: &RunStats) {
    println!("Reconciliation");
    println!("  {:<26} {}", "rows read", s.rows_read);
    println!("  {:<26} {}", "rows skipped", s.rows_skipped);
    println!("  {:<26} {}", "created", s.created);
    println!("  {:<26} {}", "updated", s.updated);
    println!("  {:<26} {}", "total records", s.total);
    println!("  {:<26} {}", "Diputados", s.deputies);
    println!("  {:<26} {}", "Senado", s.senate);
    println!("  {:<26} {}", "with signatories", s.with_signatories);
    println!("  {:<26} {}", "with referrals", s.with_referrals);
    println!("  {:<26} {}", "information requests", s.information_requests);
}

pub fn print_stats(s: &Stats) {
    println!("Records");
    println!("  {:<26} {}", "total", s.total);
    println!("  {:<26} {}", "Diputados", s.deputies);
    println!("  {:<26} {}", "Senado", s.senate);
    println!("  {:<26} {}", "on an agenda", s.with_agenda);
    println!("  {:<26} {}", "in committee", s.in_committee);
    println!("  {:<26} {}", "with signatories", s.with_signatories);
    println!("  {:<26} {}", "with movements", s.with_movements);
    println!("  {:<26} {}", "information requests", s.information_requests);
    println!();
    println!("By type");
    for (k, v) in &s.by_type {
        println!("  {:<26} {}", shorten(k, 26), v);
    }
    println!();
    println!("By status");
    for (k, v) in &s.by_status {
        println!("  {:<26} {}", shorten(k, 26), v);
    }
}

pub fn print_backup(label: &str, info: &BackupInfo) {
    println!("{label}: {} ({} records)", info.path.display(), info.records);
}

// ── Section rendering ──

fn print_section(header: &str, rows: &[(&str, Option<String>)]) {
    let present: Vec<(&str, &str)> = rows
        .iter()
        .filter_map(|(k, v)| v.as_deref().filter(|v| !v.is_empty()).map(|v| (*k, v)))
        .collect();
    if present.is_empty() {
        return;
    }
    println!("{header}");
    for (k, v) in present {
        println!("  {:<26} {}", k, v);
    }
    println!();
}

fn print_list(header: &str, lines: impl ExactSizeIterator<Item = String>) {
    let len = lines.len();
    if len == 0 {
        return;
    }
    println!("{header} ({len}):");
    for line in lines.take(MAX_LIST_ITEMS) {
        println!("    {}", line.trim_end());
    }
    if len > MAX_LIST_ITEMS {
        println!("    ... and {} more", len - MAX_LIST_ITEMS);
    }
    println!();
}

fn joined(items: &[String]) -> Option<String> {
    (!items.is_empty()).then(|| items.join(", "))
}

/// Truncate to `max` characters with a trailing ellipsis.
fn shorten(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorten_respects_char_boundaries() {
        assert_eq!(shorten("corto", 10), "corto");
        assert_eq!(shorten("Régimen de pesca", 10), "Régimen...");
        assert_eq!(shorten("ññññññ", 5), "ññ...");
    }

    #[test]
    fn empty_lists_have_no_text() {
        assert_eq!(joined(&[]), None);
        assert_eq!(joined(&["A".into(), "B".into()]).as_deref(), Some("A, B"));
    }
}
