//! Command-line parsing for the loan book report.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the aggregation code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::Rating;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "loanstats", version, about = "Loan book statistics with charge-off adjusted default rates")]
pub struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a loan CSV and print every table; optionally export them.
    Report(ReportArgs),
    /// Adjust a single outcome mix without loading any data.
    Adjust(AdjustArgs),
    /// Write a seeded synthetic loan book CSV.
    Sample(SampleArgs),
}

/// Recovery-rate overrides. Unset bounds fall back to the environment, then defaults.
#[derive(Debug, Args, Clone, Default)]
pub struct RecoveryArgs {
    /// Low recovery-rate bound (fraction in [0, 1]).
    #[arg(long)]
    pub recovery_low: Option<f64>,

    /// Mid recovery-rate bound (fraction in [0, 1]).
    #[arg(long)]
    pub recovery_mid: Option<f64>,

    /// High recovery-rate bound (fraction in [0, 1]).
    #[arg(long)]
    pub recovery_high: Option<f64>,
}

/// Options for the full report.
#[derive(Debug, Parser, Clone)]
pub struct ReportArgs {
    /// Loan CSV to read.
    #[arg(short = 'f', long, value_name = "CSV")]
    pub csv: PathBuf,

    #[command(flatten)]
    pub recovery: RecoveryArgs,

    /// Rank gap a rating must exceed before it is flagged (0 flags any inversion).
    #[arg(long)]
    pub mismatch_threshold: Option<usize>,

    /// Number of rejected-row examples to print.
    #[arg(long, default_value_t = 5)]
    pub examples: usize,

    /// Write every table as CSV into this directory.
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,

    /// Write the full report as JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

/// Options for adjusting a single outcome mix.
#[derive(Debug, Parser, Clone)]
pub struct AdjustArgs {
    /// Rating label for the printed row.
    #[arg(long, default_value = "C")]
    pub rating: Rating,

    /// Share of terminal loans that defaulted.
    #[arg(long)]
    pub defaulted: f64,

    /// Share of terminal loans that were charged off.
    #[arg(long)]
    pub chargeoff: f64,

    /// Share of terminal loans that completed.
    #[arg(long)]
    pub completed: f64,

    #[command(flatten)]
    pub recovery: RecoveryArgs,
}

/// Options for synthetic book generation.
#[derive(Debug, Parser, Clone)]
pub struct SampleArgs {
    /// Number of loans to generate.
    #[arg(short = 'n', long, default_value_t = 10_000)]
    pub rows: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output CSV path.
    #[arg(short, long, value_name = "CSV")]
    pub out: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_report_with_overrides() {
        let cli = Cli::parse_from([
            "loanstats",
            "report",
            "--csv",
            "loans.csv",
            "--recovery-high",
            "0.2",
            "--mismatch-threshold",
            "1",
            "-v",
        ]);
        assert!(cli.verbose);
        let Command::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.csv, PathBuf::from("loans.csv"));
        assert_eq!(args.recovery.recovery_high, Some(0.2));
        assert_eq!(args.recovery.recovery_low, None);
        assert_eq!(args.mismatch_threshold, Some(1));
        assert_eq!(args.examples, 5);
    }

    #[test]
    fn adjust_requires_all_three_shares() {
        assert!(Cli::try_parse_from(["loanstats", "adjust", "--defaulted", "0.1"]).is_err());
        assert!(
            Cli::try_parse_from([
                "loanstats",
                "adjust",
                "--defaulted",
                "0.02",
                "--chargeoff",
                "0.21",
                "--completed",
                "0.77"
            ])
            .is_ok()
        );
    }

    #[test]
    fn adjust_rating_parses_case_insensitively() {
        let cli = Cli::parse_from([
            "loanstats",
            "adjust",
            "--rating",
            "hr",
            "--defaulted",
            "0.05",
            "--chargeoff",
            "0.29",
            "--completed",
            "0.66",
        ]);
        let Command::Adjust(args) = cli.command else {
            panic!("expected adjust");
        };
        assert_eq!(args.rating, Rating::HR);
        assert!(Cli::try_parse_from(["loanstats", "adjust", "--rating", "Z", "--defaulted", "0", "--chargeoff", "0", "--completed", "1"]).is_err());
    }
}
