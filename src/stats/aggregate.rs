//! Segment aggregation: rating x status counts and terminal outcome mixes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{LoanRecord, LoanStatus, Rating, SegmentFrequency};

/// Rating x status count table (all statuses, `CURRENT` included).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusCrosstab {
    pub counts: BTreeMap<Rating, BTreeMap<LoanStatus, usize>>,
}

impl StatusCrosstab {
    pub fn count(&self, rating: Rating, status: LoanStatus) -> usize {
        self.counts
            .get(&rating)
            .and_then(|row| row.get(&status))
            .copied()
            .unwrap_or(0)
    }

    pub fn rating_total(&self, rating: Rating) -> usize {
        self.counts.get(&rating).map(|row| row.values().sum()).unwrap_or(0)
    }

    pub fn status_total(&self, status: LoanStatus) -> usize {
        self.counts.values().filter_map(|row| row.get(&status)).sum()
    }

    pub fn total(&self) -> usize {
        self.counts.values().flat_map(|row| row.values()).sum()
    }

    pub fn ratings(&self) -> impl Iterator<Item = Rating> + '_ {
        self.counts.keys().copied()
    }
}

/// Count every rating x status combination.
pub fn status_crosstab(records: &[LoanRecord]) -> StatusCrosstab {
    let mut table = StatusCrosstab::default();
    for r in records {
        *table
            .counts
            .entry(r.rating)
            .or_default()
            .entry(r.status)
            .or_insert(0) += 1;
    }
    table
}

/// Terminal outcome mix per rating.
///
/// `CURRENT` loans have no outcome yet and are left out of the denominator.
/// Ratings with no terminal loans are absent from the result.
pub fn segment_frequencies(records: &[LoanRecord]) -> BTreeMap<Rating, SegmentFrequency> {
    // (defaulted, chargeoff, completed)
    let mut counts: BTreeMap<Rating, (usize, usize, usize)> = BTreeMap::new();
    for r in records.iter().filter(|r| r.status.is_terminal()) {
        let entry = counts.entry(r.rating).or_default();
        match r.status {
            LoanStatus::Defaulted => entry.0 += 1,
            LoanStatus::Chargeoff => entry.1 += 1,
            LoanStatus::Completed => entry.2 += 1,
            LoanStatus::Current => {}
        }
    }

    counts
        .into_iter()
        .filter_map(|(rating, (d, c, k))| {
            SegmentFrequency::from_counts(rating, d, c, k).map(|f| (rating, f))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rec(rating: Rating, status: LoanStatus) -> LoanRecord {
        LoanRecord {
            rating,
            status,
            borrower_rate: 0.1,
            default_reason: None,
            days_past_due: None,
            fees_paid: None,
        }
    }

    #[test]
    fn current_loans_do_not_dilute_the_denominator() {
        let records = vec![
            rec(Rating::C, LoanStatus::Completed),
            rec(Rating::C, LoanStatus::Chargeoff),
            rec(Rating::C, LoanStatus::Current),
            rec(Rating::C, LoanStatus::Current),
        ];
        let freqs = segment_frequencies(&records);
        let c = freqs[&Rating::C];
        assert_eq!(c.n_terminal(), 2);
        assert!((c.p_completed - 0.5).abs() < 1e-12);
        assert!((c.p_chargeoff - 0.5).abs() < 1e-12);
        assert_eq!(c.p_defaulted, 0.0);
    }

    #[test]
    fn rating_with_only_current_loans_is_omitted() {
        let records = vec![
            rec(Rating::AA, LoanStatus::Current),
            rec(Rating::B, LoanStatus::Defaulted),
        ];
        let freqs = segment_frequencies(&records);
        assert!(!freqs.contains_key(&Rating::AA));
        assert_eq!(freqs.len(), 1);
        assert_eq!(freqs[&Rating::B].p_defaulted, 1.0);
    }

    #[test]
    fn crosstab_counts_and_totals() {
        let records = vec![
            rec(Rating::A, LoanStatus::Current),
            rec(Rating::A, LoanStatus::Current),
            rec(Rating::A, LoanStatus::Completed),
            rec(Rating::HR, LoanStatus::Chargeoff),
        ];
        let table = status_crosstab(&records);
        assert_eq!(table.count(Rating::A, LoanStatus::Current), 2);
        assert_eq!(table.count(Rating::HR, LoanStatus::Completed), 0);
        assert_eq!(table.rating_total(Rating::A), 3);
        assert_eq!(table.status_total(LoanStatus::Chargeoff), 1);
        assert_eq!(table.total(), 4);
        assert_eq!(table.ratings().collect::<Vec<_>>(), vec![Rating::A, Rating::HR]);
    }

    fn arb_record() -> impl Strategy<Value = LoanRecord> {
        (0usize..7, 0usize..4).prop_map(|(r, s)| rec(Rating::ALL[r], LoanStatus::ALL[s]))
    }

    proptest! {
        #[test]
        fn prop_frequencies_sum_to_one(records in prop::collection::vec(arb_record(), 0..300)) {
            for f in segment_frequencies(&records).values() {
                prop_assert!((f.total() - 1.0).abs() < 1e-9);
                prop_assert!(f.n_terminal() > 0);
            }
        }
    }
}
