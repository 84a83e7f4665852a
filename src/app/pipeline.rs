//! Shared "report pipeline" logic used by the CLI commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load -> cross-tab -> terminal frequencies -> adjust -> compare
//!
//! The front-end can then focus on presentation (printing vs exporting).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{AdjustedRateRow, LoanRecord, Rating, RecoveryBounds, ReportConfig, SegmentFrequency};
use crate::error::{AppError, ValidationError};
use crate::io::ingest::{LoadOutcome, load_loan_csv};
use crate::stats::{
    RateComparison, RecordSummary, StatusCrosstab, adjusted_rates, compare_rates, describe_records,
    segment_frequencies, status_crosstab,
};

/// Every table derived from a validated record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTables {
    pub summary: RecordSummary,
    pub crosstab: StatusCrosstab,
    pub frequencies: BTreeMap<Rating, SegmentFrequency>,
    pub adjusted: Vec<AdjustedRateRow>,
    pub comparison: RateComparison,
}

/// All computed outputs of a single `loanstats report` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub load: LoadOutcome,
    pub tables: ReportTables,
}

/// Compute every table from records. Pure and deterministic.
pub fn build_tables(
    records: &[LoanRecord],
    recovery: &RecoveryBounds,
    mismatch_threshold: usize,
) -> Result<ReportTables, ValidationError> {
    let summary = describe_records(records);
    let crosstab = status_crosstab(records);
    let frequencies = segment_frequencies(records);

    for rating in Rating::ALL {
        if crosstab.rating_total(rating) > 0 && !frequencies.contains_key(&rating) {
            info!(rating = %rating, "no terminal loans; rating left out of adjusted tables");
        }
    }

    let adjusted = adjusted_rates(&frequencies, recovery)?;
    let comparison = compare_rates(records, &adjusted, mismatch_threshold);

    Ok(ReportTables {
        summary,
        crosstab,
        frequencies,
        adjusted,
        comparison,
    })
}

/// Execute the full report pipeline and return the computed outputs.
pub fn run_report(config: &ReportConfig) -> Result<RunOutput, AppError> {
    // 1) Configuration errors abort before any data is touched.
    config.recovery.validate()?;

    // 2) Load and validate records; bad rows are collected, not fatal.
    //    Rejected-row examples are printed with the run summary.
    let load = load_loan_csv(&config.csv_path)?;

    // 3) Aggregate, adjust, compare.
    let tables = build_tables(&load.records, &config.recovery, config.mismatch_threshold)?;

    Ok(RunOutput { load, tables })
}
