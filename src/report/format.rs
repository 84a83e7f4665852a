//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the aggregation code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use std::collections::BTreeMap;

use crate::app::pipeline::ReportTables;
use crate::domain::{AdjustedRateRow, LoanStatus, Rating, RecoveryBounds, ReportConfig, SegmentFrequency};
use crate::io::ingest::LoadOutcome;
use crate::stats::{FieldSummary, RateComparison, RecordSummary, StatusCrosstab};

/// Format the load diagnostics and run configuration.
pub fn format_run_summary(load: &LoadOutcome, config: &ReportConfig) -> String {
    let mut out = String::new();

    out.push_str("=== loanstats - Loan Book Report ===\n");
    out.push_str(&format!("Source: {}\n", config.csv_path.display()));
    out.push_str(&format!(
        "Rows: read={} | used={} | rejected={} | duplicates={}\n",
        load.rows_read,
        load.rows_used(),
        load.rejected.len(),
        load.duplicate_rows,
    ));
    for e in load.rejected.iter().take(config.error_examples) {
        out.push_str(&format!("  line {:>6}: {}\n", e.line, e.message));
    }
    let hidden = load.rejected.len().saturating_sub(config.error_examples);
    if hidden > 0 {
        out.push_str(&format!("  ... and {hidden} more\n"));
    }
    out.push_str(&format!("Recovery: {}\n", fmt_bounds(&config.recovery)));
    out.push_str(&format!("Mismatch threshold: {}\n", config.mismatch_threshold));
    out.push('\n');

    out
}

/// Format every derived table.
pub fn format_tables(tables: &ReportTables, recovery: &RecoveryBounds) -> String {
    let mut out = String::new();

    out.push_str("Numeric fields:\n");
    out.push_str(&format_summary(&tables.summary));
    out.push('\n');

    out.push_str("Loans by rating and status:\n");
    out.push_str(&format_crosstab(&tables.crosstab));
    out.push('\n');

    out.push_str("Terminal outcome mix (CURRENT excluded):\n");
    out.push_str(&format_frequencies(&tables.frequencies));
    out.push('\n');

    out.push_str(&format!(
        "Charge-off adjusted rates, recovery {} (sorted by defaulted_high):\n",
        fmt_bounds(recovery)
    ));
    out.push_str(&format_adjusted(&tables.adjusted));
    out.push('\n');

    out.push_str("Mean borrower rate vs adjusted risk:\n");
    out.push_str(&format_comparison(&tables.comparison));

    out
}

pub fn format_summary(summary: &RecordSummary) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:<14} {:>8} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "field", "count", "mean", "std", "min", "p25", "median", "p75", "max"
        ),
    );
    push_line(&mut out, rule(&[14, 8, 10, 10, 10, 10, 10, 10, 10]));
    for (name, field) in [
        ("borrower_rate", &summary.borrower_rate),
        ("days_past_due", &summary.days_past_due),
        ("fees_paid", &summary.fees_paid),
    ] {
        match field {
            Some(s) => push_line(&mut out, fmt_summary_row(name, s)),
            None => push_line(&mut out, format!("{name:<14} {:>8}", 0)),
        }
    }
    out
}

fn fmt_summary_row(name: &str, s: &FieldSummary) -> String {
    format!(
        "{:<14} {:>8} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
        name, s.count, s.mean, s.std, s.min, s.p25, s.median, s.p75, s.max
    )
}

pub fn format_crosstab(table: &StatusCrosstab) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:<6} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "rating", "CURRENT", "COMPLETED", "DEFAULTED", "CHARGEOFF", "total"
        ),
    );
    push_line(&mut out, rule(&[6, 10, 10, 10, 10, 10]));
    for rating in table.ratings() {
        let [cur, com, def, chg] = LoanStatus::ALL.map(|s| table.count(rating, s));
        push_line(
            &mut out,
            format!(
                "{:<6} {:>10} {:>10} {:>10} {:>10} {:>10}",
                rating.code(),
                cur,
                com,
                def,
                chg,
                table.rating_total(rating)
            ),
        );
    }
    let [cur, com, def, chg] = LoanStatus::ALL.map(|s| table.status_total(s));
    push_line(
        &mut out,
        format!(
            "{:<6} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "total",
            cur,
            com,
            def,
            chg,
            table.total()
        ),
    );
    out
}

pub fn format_frequencies(freqs: &BTreeMap<Rating, SegmentFrequency>) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:<6} {:>8} {:>10} {:>10} {:>10}",
            "rating", "n", "defaulted", "chargeoff", "completed"
        ),
    );
    push_line(&mut out, rule(&[6, 8, 10, 10, 10]));
    for f in freqs.values() {
        push_line(
            &mut out,
            format!(
                "{:<6} {:>8} {:>10} {:>10} {:>10}",
                f.rating.code(),
                f.n_terminal(),
                fmt_pct(f.p_defaulted),
                fmt_pct(f.p_chargeoff),
                fmt_pct(f.p_completed)
            ),
        );
    }
    for rating in Rating::ALL.iter().filter(|r| !freqs.contains_key(*r)) {
        push_line(&mut out, format!("{:<6} {:>8}  (insufficient data)", rating.code(), 0));
    }
    out
}

pub fn format_adjusted(rows: &[AdjustedRateRow]) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:<6} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9}",
            "rating", "def_raw", "def_low", "def_mid", "def_high", "com_low", "com_mid", "com_high"
        ),
    );
    push_line(&mut out, rule(&[6, 9, 9, 9, 9, 9, 9, 9]));
    for r in rows {
        push_line(
            &mut out,
            format!(
                "{:<6} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9}",
                r.rating.code(),
                fmt_pct(r.defaulted_raw),
                fmt_pct(r.defaulted_low),
                fmt_pct(r.defaulted_mid),
                fmt_pct(r.defaulted_high),
                fmt_pct(r.completed_low),
                fmt_pct(r.completed_mid),
                fmt_pct(r.completed_high)
            ),
        );
    }
    out
}

pub fn format_comparison(cmp: &RateComparison) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:<6} {:>8} {:>10} {:>7} {:>7} {:<10}",
            "rating", "loans", "mean_rate", "reward", "risk", "mismatch"
        ),
    );
    push_line(&mut out, rule(&[6, 8, 10, 7, 7, 10]));
    for r in &cmp.rows {
        let flag = match r.mismatch {
            Some(true) => "YES",
            Some(false) => "-",
            None => "n/a",
        };
        push_line(
            &mut out,
            format!(
                "{:<6} {:>8} {:>10} {:>7} {:>7} {:<10}",
                r.rating.code(),
                r.n_loans,
                fmt_pct(r.mean_borrower_rate),
                fmt_rank(r.reward_rank),
                fmt_rank(r.risk_rank),
                flag
            ),
        );
    }

    let flagged: Vec<&str> = cmp.mismatches().map(|r| r.rating.code()).collect();
    if flagged.is_empty() {
        out.push_str("\nReward tracks adjusted risk for every rating.\n");
    } else {
        out.push_str(&format!(
            "\nPays more than its adjusted risk rank suggests: {}\n",
            flagged.join(", ")
        ));
    }
    out
}

fn fmt_bounds(b: &RecoveryBounds) -> String {
    format!("low={} mid={} high={}", fmt_pct(b.low), fmt_pct(b.mid), fmt_pct(b.high))
}

fn fmt_pct(v: f64) -> String {
    format!("{:.2}%", v * 100.0)
}

fn fmt_rank(rank: Option<usize>) -> String {
    rank.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())
}

fn rule(widths: &[usize]) -> String {
    widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join(" ")
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::adjust_row;

    #[test]
    fn adjusted_table_renders_percentages() {
        let f = SegmentFrequency::from_proportions(Rating::C, 0.02, 0.21, 0.77);
        let row = adjust_row(&f, &RecoveryBounds::default());
        let text = format_adjusted(&[row]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("rating"));
        assert!(lines[2].starts_with("C "));
        assert!(lines[2].contains("21.53%"));
        assert!(lines[2].contains("20.48%"));
    }

    #[test]
    fn missing_ratings_marked_insufficient() {
        let mut freqs = BTreeMap::new();
        freqs.insert(Rating::A, SegmentFrequency::from_counts(Rating::A, 1, 0, 3).unwrap());
        let text = format_frequencies(&freqs);
        assert!(text.contains("25.00%"));
        assert_eq!(text.matches("insufficient data").count(), 6);
    }

    #[test]
    fn run_summary_shows_first_rejects_once() {
        let load = LoadOutcome {
            records: vec![],
            rejected: (2..5)
                .map(|line| crate::io::ingest::RowError {
                    line,
                    message: format!("bad row {line}"),
                })
                .collect(),
            rows_read: 3,
            duplicate_rows: 0,
        };
        let mut config = ReportConfig::new("loans.csv");
        config.error_examples = 2;

        let text = format_run_summary(&load, &config);
        assert!(text.contains("rejected=3"));
        assert_eq!(text.matches("bad row 2").count(), 1);
        assert!(text.contains("bad row 3"));
        assert!(!text.contains("bad row 4"));
        assert!(text.contains("... and 1 more"));
    }

    #[test]
    fn comparison_lists_flagged_ratings() {
        let cmp = RateComparison {
            threshold: 0,
            rows: vec![crate::domain::RateComparisonRow {
                rating: Rating::HR,
                n_loans: 10,
                mean_borrower_rate: 0.31,
                reward_rank: Some(1),
                risk_rank: Some(2),
                mismatch: Some(true),
            }],
        };
        let text = format_comparison(&cmp);
        assert!(text.contains("YES"));
        assert!(text.contains("suggests: HR"));
    }
}
