//! Reward vs adjusted-risk comparison.
//!
//! Mean borrower rate is the reward a rating pays; `defaulted_mid` is its
//! adjusted risk. When reward tracks risk, the rating with the Nth highest
//! adjusted default rate also pays the Nth highest rate. A rating whose reward
//! rank beats its risk rank by more than the threshold is flagged as a
//! mismatch: it pays more than its risk would suggest.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{AdjustedRateRow, LoanRecord, RateComparisonRow, Rating};

/// Mean-rate table sorted by mean rate descending, with mismatch flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateComparison {
    pub threshold: usize,
    pub rows: Vec<RateComparisonRow>,
}

impl RateComparison {
    pub fn mismatches(&self) -> impl Iterator<Item = &RateComparisonRow> {
        self.rows.iter().filter(|r| r.mismatch == Some(true))
    }
}

/// Mean borrower rate and loan count per rating (all statuses).
pub fn mean_rates(records: &[LoanRecord]) -> BTreeMap<Rating, (usize, f64)> {
    let mut sums: BTreeMap<Rating, (usize, f64)> = BTreeMap::new();
    for r in records {
        let entry = sums.entry(r.rating).or_default();
        entry.0 += 1;
        entry.1 += r.borrower_rate;
    }
    sums.into_iter()
        .map(|(rating, (n, sum))| (rating, (n, sum / n as f64)))
        .collect()
}

/// Cross-reference mean rates against the adjusted-risk order.
///
/// Ratings that have loans but no adjusted row (no terminal outcomes yet) are
/// listed with `mismatch: None`.
pub fn compare_rates(records: &[LoanRecord], adjusted: &[AdjustedRateRow], threshold: usize) -> RateComparison {
    let means = mean_rates(records);
    let risk: HashMap<Rating, f64> = adjusted.iter().map(|r| (r.rating, r.defaulted_mid)).collect();

    // Ranks are computed over ratings that have both a mean rate and a risk estimate.
    let mut by_reward: Vec<(Rating, f64)> = means
        .iter()
        .filter(|(rating, _)| risk.contains_key(*rating))
        .map(|(&rating, &(_, mean))| (rating, mean))
        .collect();
    by_reward.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let reward_rank: HashMap<Rating, usize> =
        by_reward.iter().enumerate().map(|(i, (rating, _))| (*rating, i + 1)).collect();

    let mut by_risk: Vec<(Rating, f64)> = by_reward.iter().map(|&(rating, _)| (rating, risk[&rating])).collect();
    // Riskiest first; on equal risk the worse grade ranks riskier.
    by_risk.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
    let risk_rank: HashMap<Rating, usize> =
        by_risk.iter().enumerate().map(|(i, (rating, _))| (*rating, i + 1)).collect();

    let mut rows: Vec<RateComparisonRow> = means
        .iter()
        .map(|(&rating, &(n_loans, mean))| {
            let reward = reward_rank.get(&rating).copied();
            let risk = risk_rank.get(&rating).copied();
            let mismatch = match (reward, risk) {
                (Some(reward), Some(risk)) => Some(risk.saturating_sub(reward) > threshold),
                _ => None,
            };
            RateComparisonRow {
                rating,
                n_loans,
                mean_borrower_rate: mean,
                reward_rank: reward,
                risk_rank: risk,
                mismatch,
            }
        })
        .collect();

    rows.sort_by(by_mean_rate_desc);

    for row in rows.iter().filter(|r| r.mismatch == Some(true)) {
        debug!(
            rating = %row.rating,
            reward_rank = ?row.reward_rank,
            risk_rank = ?row.risk_rank,
            "reward exceeds adjusted-risk rank"
        );
    }

    RateComparison { threshold, rows }
}

fn by_mean_rate_desc(a: &RateComparisonRow, b: &RateComparisonRow) -> Ordering {
    b.mean_borrower_rate
        .total_cmp(&a.mean_borrower_rate)
        .then_with(|| a.rating.cmp(&b.rating))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LoanStatus, RecoveryBounds, SegmentFrequency};
    use crate::stats::adjust::adjust_row;

    fn rec(rating: Rating, rate: f64) -> LoanRecord {
        LoanRecord {
            rating,
            status: LoanStatus::Completed,
            borrower_rate: rate,
            default_reason: None,
            days_past_due: None,
            fees_paid: None,
        }
    }

    fn adj(rating: Rating, defaulted: f64) -> AdjustedRateRow {
        let f = SegmentFrequency::from_proportions(rating, defaulted, 0.0, 1.0 - defaulted);
        adjust_row(&f, &RecoveryBounds::default())
    }

    #[test]
    fn mean_rate_per_rating() {
        let records = vec![rec(Rating::A, 0.1), rec(Rating::A, 0.2), rec(Rating::B, 0.3)];
        let means = mean_rates(&records);
        assert_eq!(means[&Rating::A].0, 2);
        assert!((means[&Rating::A].1 - 0.15).abs() < 1e-12);
        assert!((means[&Rating::B].1 - 0.3).abs() < 1e-12);
    }

    #[test]
    fn consistent_market_has_no_mismatch() {
        let records = vec![rec(Rating::A, 0.1), rec(Rating::C, 0.2), rec(Rating::E, 0.3)];
        let adjusted = vec![adj(Rating::A, 0.05), adj(Rating::C, 0.15), adj(Rating::E, 0.25)];
        let cmp = compare_rates(&records, &adjusted, 0);
        let order: Vec<Rating> = cmp.rows.iter().map(|r| r.rating).collect();
        assert_eq!(order, vec![Rating::E, Rating::C, Rating::A]);
        assert!(cmp.rows.iter().all(|r| r.mismatch == Some(false)));
        assert_eq!(cmp.mismatches().count(), 0);
    }

    #[test]
    fn hr_paying_more_than_riskier_e_is_flagged() {
        let records = vec![rec(Rating::D, 0.24), rec(Rating::E, 0.28), rec(Rating::HR, 0.32)];
        // E is the riskiest after adjustment, HR pays the most.
        let adjusted = vec![adj(Rating::D, 0.20), adj(Rating::E, 0.30), adj(Rating::HR, 0.27)];
        let cmp = compare_rates(&records, &adjusted, 0);

        let hr = cmp.rows.iter().find(|r| r.rating == Rating::HR).unwrap();
        assert_eq!(hr.reward_rank, Some(1));
        assert_eq!(hr.risk_rank, Some(2));
        assert_eq!(hr.mismatch, Some(true));

        let e = cmp.rows.iter().find(|r| r.rating == Rating::E).unwrap();
        assert_eq!(e.mismatch, Some(false));

        let flagged: Vec<Rating> = cmp.mismatches().map(|r| r.rating).collect();
        assert_eq!(flagged, vec![Rating::HR]);
    }

    #[test]
    fn threshold_suppresses_small_inversions() {
        let records = vec![rec(Rating::D, 0.24), rec(Rating::E, 0.28), rec(Rating::HR, 0.32)];
        let adjusted = vec![adj(Rating::D, 0.20), adj(Rating::E, 0.30), adj(Rating::HR, 0.27)];
        let cmp = compare_rates(&records, &adjusted, 1);
        assert_eq!(cmp.mismatches().count(), 0);

        // A two-rank inversion still clears a threshold of 1.
        let adjusted = vec![adj(Rating::D, 0.35), adj(Rating::E, 0.30), adj(Rating::HR, 0.10)];
        let cmp = compare_rates(&records, &adjusted, 1);
        let flagged: Vec<Rating> = cmp.mismatches().map(|r| r.rating).collect();
        assert_eq!(flagged, vec![Rating::HR]);
    }

    #[test]
    fn rating_without_terminal_data_is_unflagged() {
        let records = vec![rec(Rating::AA, 0.06), rec(Rating::B, 0.18)];
        let adjusted = vec![adj(Rating::B, 0.1)];
        let cmp = compare_rates(&records, &adjusted, 0);
        let aa = cmp.rows.iter().find(|r| r.rating == Rating::AA).unwrap();
        assert_eq!(aa.mismatch, None);
        assert_eq!(aa.reward_rank, None);
        assert_eq!(aa.risk_rank, None);
        assert_eq!(cmp.rows[0].rating, Rating::B);
    }
}
