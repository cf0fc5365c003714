//! Listing order for case records and agenda items.
//!
//! Records list newest first:
//!
//! - entry date, descending
//! - sequence number parsed from the identifier, descending
//! - input order, for records equal on both
//!
//! Identifiers without a sequence sort as 0, so they fall to the end of their day.

use chrono::NaiveDate;

use crate::agenda::OrdenDelDia;
use crate::identifier;
use crate::record::Expediente;

/// Ascending key; callers sort by it in reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    pub entry_date: NaiveDate,
    pub sequence: u32,
}

pub fn sort_key(record: &Expediente) -> SortKey {
    SortKey {
        entry_date: record.entry_date,
        sequence: record.sequence(),
    }
}

/// Newest first. Stable.
pub fn sort_records(records: &mut [Expediente]) {
    records.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
}

/// Highest order number first. Stable.
pub fn sort_agenda(items: &mut [OrdenDelDia]) {
    items.sort_by_key(|item| std::cmp::Reverse(identifier::sequence_of(&item.number)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge;
    use crate::record::PartialRecord;

    fn record(identifier: &str, date: (i32, u32, u32)) -> Expediente {
        let day = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        let mut partial = PartialRecord::new(identifier, day);
        partial.entry_date_inferred = false;
        merge::create(partial)
    }

    /// Helper: assert records come out of `sort_records` in the given identifier order.
    fn assert_sorted_order(mut records: Vec<Expediente>, expected: &[&str]) {
        sort_records(&mut records);
        let got: Vec<&str> = records.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn newest_date_first() {
        assert_sorted_order(
            vec![
                record("1-D-2025", (2025, 1, 10)),
                record("2-D-2025", (2025, 3, 1)),
                record("3-D-2025", (2024, 12, 31)),
            ],
            &["2-D-2025", "1-D-2025", "3-D-2025"],
        );
    }

    #[test]
    fn sequence_breaks_ties_numerically() {
        assert_sorted_order(
            vec![
                record("99-D-2025", (2025, 5, 5)),
                record("1000-D-2025", (2025, 5, 5)),
                record("S-120/25", (2025, 5, 5)),
            ],
            &["1000-D-2025", "S-120/25", "99-D-2025"],
        );
    }

    #[test]
    fn equal_keys_keep_input_order() {
        assert_sorted_order(
            vec![
                record("7-D-2025", (2025, 5, 5)),
                record("7-S-2025", (2025, 5, 5)),
                record("sin número", (2025, 5, 5)),
                record("otro sin número", (2025, 5, 5)),
            ],
            &["7-D-2025", "7-S-2025", "sin número", "otro sin número"],
        );
    }

    #[test]
    fn exact_values() {
        let r = record("S-577/25", (2025, 6, 1));
        assert_eq!(
            sort_key(&r),
            SortKey {
                entry_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                sequence: 577,
            }
        );
    }
}
