//! Descriptive distribution summaries for numeric loan fields.

use serde::{Deserialize, Serialize};

use crate::domain::LoanRecord;

/// Count, moments, and quartiles of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1). Zero for a single value.
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

/// Summaries of the numeric fields that carry no role in the adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub borrower_rate: Option<FieldSummary>,
    pub days_past_due: Option<FieldSummary>,
    pub fees_paid: Option<FieldSummary>,
}

pub fn describe_records(records: &[LoanRecord]) -> RecordSummary {
    let rates: Vec<f64> = records.iter().map(|r| r.borrower_rate).collect();
    let late: Vec<f64> = records.iter().filter_map(|r| r.days_past_due).collect();
    let fees: Vec<f64> = records.iter().filter_map(|r| r.fees_paid).collect();

    RecordSummary {
        borrower_rate: summarize(&rates),
        days_past_due: summarize(&late),
        fees_paid: summarize(&fees),
    }
}

/// Summarize finite values; `None` when there are none.
pub fn summarize(values: &[f64]) -> Option<FieldSummary> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let std = if n > 1 {
        let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n as f64 - 1.0)).sqrt()
    } else {
        0.0
    };

    Some(FieldSummary {
        count: n,
        mean,
        std,
        min: sorted[0],
        p25: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        p75: quantile_sorted(&sorted, 0.75),
        max: sorted[n - 1],
    })
}

/// Linear interpolation between order statistics. `sorted` must be non-empty.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}
