//! Charge-off adjusted default rates.
//!
//! A charge-off is an accounting write-off, not a repayment outcome: part of
//! the charged-off balance is still recovered afterwards. The raw `DEFAULTED`
//! share therefore understates risk whenever charge-offs are common.
//!
//! For a recovery rate `r`, the charge-off mass is split between the two
//! remaining outcomes:
//!
//! ```text
//! p_completed_adj = p_completed + r       * p_chargeoff
//! p_defaulted_adj = p_defaulted + (1 - r) * p_chargeoff
//! ```
//!
//! The split is mass conserving, so `p_completed_adj + p_defaulted_adj` equals
//! the original total.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{AdjustedRateRow, AdjustedSegmentRate, RecoveryBounds, Rating, SegmentFrequency};
use crate::error::ValidationError;

/// Reallocate the charge-off share of one segment at recovery rate `r`.
///
/// `r` is not range-checked here; `adjusted_rates` validates its bounds first.
pub fn adjust_segment(freq: &SegmentFrequency, recovery_rate: f64) -> AdjustedSegmentRate {
    AdjustedSegmentRate {
        rating: freq.rating,
        recovery_rate,
        p_completed_adj: freq.p_completed + recovery_rate * freq.p_chargeoff,
        p_defaulted_adj: freq.p_defaulted + (1.0 - recovery_rate) * freq.p_chargeoff,
    }
}

/// Adjusted rates for one segment at the low/mid/high recovery bounds.
pub fn adjust_row(freq: &SegmentFrequency, bounds: &RecoveryBounds) -> AdjustedRateRow {
    let [low, mid, high] = bounds.as_array().map(|r| adjust_segment(freq, r));
    AdjustedRateRow {
        rating: freq.rating,
        defaulted_raw: freq.p_defaulted,
        completed_low: low.p_completed_adj,
        completed_mid: mid.p_completed_adj,
        completed_high: high.p_completed_adj,
        defaulted_low: low.p_defaulted_adj,
        defaulted_mid: mid.p_defaulted_adj,
        defaulted_high: high.p_defaulted_adj,
    }
}

/// Build the adjusted-rate table, ranked by `defaulted_high` ascending.
///
/// Ties fall back to rating order (AA before A before B ...). Invalid bounds
/// abort the whole computation.
pub fn adjusted_rates(
    frequencies: &BTreeMap<Rating, SegmentFrequency>,
    bounds: &RecoveryBounds,
) -> Result<Vec<AdjustedRateRow>, ValidationError> {
    bounds.validate()?;

    let mut rows: Vec<AdjustedRateRow> = frequencies.values().map(|f| adjust_row(f, bounds)).collect();
    rows.sort_by(by_defaulted_high);

    for row in &rows {
        debug!(
            rating = %row.rating,
            raw = row.defaulted_raw,
            low = row.defaulted_low,
            mid = row.defaulted_mid,
            high = row.defaulted_high,
            "adjusted default rate"
        );
    }

    Ok(rows)
}

fn by_defaulted_high(a: &AdjustedRateRow, b: &AdjustedRateRow) -> Ordering {
    a.defaulted_high
        .total_cmp(&b.defaulted_high)
        .then_with(|| a.rating.cmp(&b.rating))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn freqs(entries: &[(Rating, f64, f64, f64)]) -> BTreeMap<Rating, SegmentFrequency> {
        entries
            .iter()
            .map(|&(r, d, c, k)| (r, SegmentFrequency::from_proportions(r, d, c, k)))
            .collect()
    }

    #[test]
    fn rating_c_reference_scenario() {
        let table = freqs(&[(Rating::C, 0.02, 0.21, 0.77)]);
        let rows = adjusted_rates(&table, &RecoveryBounds::default()).unwrap();
        assert_eq!(rows.len(), 1);
        let c = rows[0];
        assert_approx(c.defaulted_low, 0.2153);
        assert_approx(c.defaulted_mid, 0.21005);
        assert_approx(c.defaulted_high, 0.2048);
        assert_approx(c.completed_low, 0.77 + 0.07 * 0.21);
        assert_approx(c.completed_high, 0.77 + 0.12 * 0.21);
        assert_eq!(c.defaulted_raw, 0.02);
    }

    #[test]
    fn full_recovery_leaves_raw_default_rate() {
        let f = SegmentFrequency::from_proportions(Rating::E, 0.04, 0.3, 0.66);
        let adj = adjust_segment(&f, 1.0);
        assert_eq!(adj.p_defaulted_adj, f.p_defaulted);
        assert_approx(adj.p_completed_adj, 0.96);
    }

    #[test]
    fn zero_recovery_moves_all_chargeoffs_to_default() {
        let f = SegmentFrequency::from_proportions(Rating::E, 0.04, 0.3, 0.66);
        let adj = adjust_segment(&f, 0.0);
        assert_approx(adj.p_defaulted_adj, 0.34);
        assert_eq!(adj.p_completed_adj, f.p_completed);
    }

    #[test]
    fn no_chargeoffs_is_a_noop() {
        let f = SegmentFrequency::from_proportions(Rating::AA, 0.01, 0.0, 0.99);
        let row = adjust_row(&f, &RecoveryBounds::default());
        for d in [row.defaulted_low, row.defaulted_mid, row.defaulted_high] {
            assert_eq!(d, f.p_defaulted);
        }
        for c in [row.completed_low, row.completed_mid, row.completed_high] {
            assert_eq!(c, f.p_completed);
        }
    }

    #[test]
    fn sorted_by_defaulted_high_ascending() {
        // No charge-offs, so defaulted_high == p_defaulted.
        let table = freqs(&[
            (Rating::A, 0.30, 0.0, 0.70),
            (Rating::B, 0.15, 0.0, 0.85),
            (Rating::C, 0.23, 0.0, 0.77),
        ]);
        let rows = adjusted_rates(&table, &RecoveryBounds::default()).unwrap();
        let order: Vec<Rating> = rows.iter().map(|r| r.rating).collect();
        assert_eq!(order, vec![Rating::B, Rating::C, Rating::A]);
        assert_eq!(rows[0].defaulted_high, 0.15);
        assert_eq!(rows[2].defaulted_high, 0.30);
    }

    #[test]
    fn ties_broken_by_rating_order() {
        let table = freqs(&[
            (Rating::HR, 0.1, 0.0, 0.9),
            (Rating::AA, 0.1, 0.0, 0.9),
            (Rating::D, 0.1, 0.0, 0.9),
        ]);
        let rows = adjusted_rates(&table, &RecoveryBounds::default()).unwrap();
        let order: Vec<Rating> = rows.iter().map(|r| r.rating).collect();
        assert_eq!(order, vec![Rating::AA, Rating::D, Rating::HR]);
    }

    #[test]
    fn invalid_bounds_abort() {
        let table = freqs(&[(Rating::C, 0.02, 0.21, 0.77)]);
        let out_of_range = RecoveryBounds { low: 0.1, mid: 0.2, high: 1.5 };
        assert!(matches!(
            adjusted_rates(&table, &out_of_range),
            Err(ValidationError::RecoveryOutOfRange { bound: "high", .. })
        ));
        let unordered = RecoveryBounds { low: 0.3, mid: 0.2, high: 0.4 };
        assert!(matches!(
            adjusted_rates(&table, &unordered),
            Err(ValidationError::RecoveryNotMonotonic { .. })
        ));
    }

    #[test]
    fn empty_input_gives_empty_table() {
        let rows = adjusted_rates(&BTreeMap::new(), &RecoveryBounds::default()).unwrap();
        assert!(rows.is_empty());
    }

    fn arb_frequency() -> impl Strategy<Value = SegmentFrequency> {
        (0usize..7, 0u32..500, 0u32..500, 0u32..500)
            .prop_filter("needs a terminal loan", |(_, d, c, k)| d + c + k > 0)
            .prop_map(|(r, d, c, k)| {
                SegmentFrequency::from_counts(Rating::ALL[r], d as usize, c as usize, k as usize)
                    .expect("non-empty counts")
            })
    }

    fn arb_bounds() -> impl Strategy<Value = RecoveryBounds> {
        prop::array::uniform3(0.0f64..=1.0).prop_map(|mut v| {
            v.sort_by(f64::total_cmp);
            RecoveryBounds { low: v[0], mid: v[1], high: v[2] }
        })
    }

    proptest! {
        #[test]
        fn prop_adjustment_conserves_mass(f in arb_frequency(), b in arb_bounds()) {
            let row = adjust_row(&f, &b);
            let total = f.total();
            prop_assert!((row.completed_low + row.defaulted_low - total).abs() < EPS);
            prop_assert!((row.completed_mid + row.defaulted_mid - total).abs() < EPS);
            prop_assert!((row.completed_high + row.defaulted_high - total).abs() < EPS);
        }

        #[test]
        fn prop_adjusted_default_is_monotone_in_recovery(f in arb_frequency(), b in arb_bounds()) {
            // More recovery means less realized default.
            let row = adjust_row(&f, &b);
            prop_assert!(row.defaulted_low + EPS >= row.defaulted_mid);
            prop_assert!(row.defaulted_mid + EPS >= row.defaulted_high);
            prop_assert!(row.completed_low <= row.completed_mid + EPS);
            prop_assert!(row.completed_mid <= row.completed_high + EPS);
            // Adjusted default never drops below the raw share.
            prop_assert!(row.defaulted_high + EPS >= row.defaulted_raw);
        }

        #[test]
        fn prop_table_is_sorted(fs in prop::collection::vec(arb_frequency(), 0..10), b in arb_bounds()) {
            let table: BTreeMap<Rating, SegmentFrequency> = fs.into_iter().map(|f| (f.rating, f)).collect();
            let rows = adjusted_rates(&table, &b).unwrap();
            prop_assert_eq!(rows.len(), table.len());
            for w in rows.windows(2) {
                prop_assert!(by_defaulted_high(&w[0], &w[1]) != Ordering::Greater);
            }
        }
    }
}
