//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - installs logging
//! - layers configuration (defaults <- `.env`/environment <- flags)
//! - runs the report pipeline
//! - prints reports and writes optional exports

use std::collections::BTreeMap;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{AdjustArgs, Command, RecoveryArgs, ReportArgs, SampleArgs};
use crate::data::{SampleConfig, generate_sample, write_sample_csv};
use crate::domain::{Rating, RecoveryBounds, ReportConfig, SegmentFrequency};
use crate::error::{AppError, ValidationError};

pub mod pipeline;

/// Environment variable holding `low,mid,high` recovery bounds.
pub const ENV_RECOVERY_BOUNDS: &str = "LOANSTATS_RECOVERY_BOUNDS";
/// Environment variable holding the mismatch rank threshold.
pub const ENV_MISMATCH_THRESHOLD: &str = "LOANSTATS_MISMATCH_THRESHOLD";

/// Entry point for the `loanstats` binary.
pub fn run() -> Result<(), AppError> {
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    init_logging(cli.verbose);

    match cli.command {
        Command::Report(args) => handle_report(args),
        Command::Adjust(args) => handle_adjust(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Ignore the error if a subscriber is already installed (e.g. in tests).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_report(args: ReportArgs) -> Result<(), AppError> {
    let env = EnvDefaults::from_env()?;
    let config = report_config_from_args(&args, &env)?;
    let run = pipeline::run_report(&config)?;

    println!("{}", crate::report::format_run_summary(&run.load, &config));
    println!("{}", crate::report::format_tables(&run.tables, &config.recovery));

    // Optional exports.
    if let Some(dir) = &config.export_dir {
        crate::io::export::write_tables_csv(dir, &run.tables)?;
    }
    if let Some(path) = &config.export_json {
        let report = crate::io::report_json::ReportFile::from_run(&run, &config);
        crate::io::report_json::write_report_json(path, &report)?;
        info!(path = %path.display(), "wrote report JSON");
    }

    Ok(())
}

fn handle_adjust(args: AdjustArgs) -> Result<(), AppError> {
    let env = EnvDefaults::from_env()?;
    let recovery = resolve_recovery(&args.recovery, env.recovery.unwrap_or_default());

    let freq = frequency_from_shares(args.rating, args.defaulted, args.chargeoff, args.completed)?;
    let table = BTreeMap::from([(freq.rating, freq)]);
    let rows = crate::stats::adjusted_rates(&table, &recovery)?;

    println!("Charge-off adjusted rates, recovery low/mid/high = {}/{}/{}:", recovery.low, recovery.mid, recovery.high);
    println!("{}", crate::report::format_adjusted(&rows));
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        rows: args.rows,
        seed: args.seed,
    };
    let loans = generate_sample(&config)?;
    write_sample_csv(&args.out, &loans)?;
    println!("Wrote {} synthetic loans to {}", loans.len(), args.out.display());
    Ok(())
}

/// Settings picked up from the process environment (and `.env`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvDefaults {
    pub recovery: Option<RecoveryBounds>,
    pub mismatch_threshold: Option<usize>,
}

impl EnvDefaults {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment, or a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let recovery = match lookup(ENV_RECOVERY_BOUNDS) {
            Some(raw) => Some(parse_bounds(&raw).map_err(|e| {
                AppError::new(2, format!("Invalid {ENV_RECOVERY_BOUNDS}='{raw}': {e}"))
            })?),
            None => None,
        };
        let mismatch_threshold = match lookup(ENV_MISMATCH_THRESHOLD) {
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|e| {
                AppError::new(2, format!("Invalid {ENV_MISMATCH_THRESHOLD}='{raw}': {e}"))
            })?),
            None => None,
        };
        Ok(Self {
            recovery,
            mismatch_threshold,
        })
    }
}

/// Parse `low,mid,high` into validated bounds.
pub fn parse_bounds(raw: &str) -> Result<RecoveryBounds, String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [low, mid, high] = parts.as_slice() else {
        return Err("expected three comma-separated fractions (low,mid,high)".to_string());
    };
    let parse = |s: &str| s.parse::<f64>().map_err(|e| format!("'{s}': {e}"));
    RecoveryBounds::new(parse(low)?, parse(mid)?, parse(high)?).map_err(|e| e.to_string())
}

/// Apply per-bound flag overrides on top of `base`. Not validated here.
pub fn resolve_recovery(args: &RecoveryArgs, base: RecoveryBounds) -> RecoveryBounds {
    RecoveryBounds {
        low: args.recovery_low.unwrap_or(base.low),
        mid: args.recovery_mid.unwrap_or(base.mid),
        high: args.recovery_high.unwrap_or(base.high),
    }
}

pub fn report_config_from_args(args: &ReportArgs, env: &EnvDefaults) -> Result<ReportConfig, AppError> {
    let recovery = resolve_recovery(&args.recovery, env.recovery.unwrap_or_default());
    recovery.validate()?;

    Ok(ReportConfig {
        csv_path: args.csv.clone(),
        recovery,
        mismatch_threshold: args
            .mismatch_threshold
            .or(env.mismatch_threshold)
            .unwrap_or(0),
        error_examples: args.examples,
        export_dir: args.export_dir.clone(),
        export_json: args.export_json.clone(),
    })
}

/// Validate a hand-entered outcome mix.
pub fn frequency_from_shares(
    rating: Rating,
    defaulted: f64,
    chargeoff: f64,
    completed: f64,
) -> Result<SegmentFrequency, ValidationError> {
    let total = defaulted + chargeoff + completed;
    let in_range = [defaulted, chargeoff, completed]
        .iter()
        .all(|p| (0.0..=1.0).contains(p));
    if !in_range || (total - 1.0).abs() > 1e-6 {
        return Err(ValidationError::InvalidProportions { total });
    }
    Ok(SegmentFrequency::from_proportions(rating, defaulted, chargeoff, completed))
}

/// Rewrite argv so a bare flag invocation runs `report`.
///
/// Rules:
/// - `loanstats --csv x.csv ...`   -> `loanstats report --csv x.csv ...`
/// - `loanstats -v -f x.csv`       -> `loanstats -v report -f x.csv`
/// - `loanstats`, `--help`, `--version`, `help` -> unchanged
///
/// Only the first token after the global `-v/--verbose` flags decides, so a
/// flag value that happens to read `report` is not mistaken for a subcommand.
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(first) = argv
        .iter()
        .skip(1)
        .position(|a| !matches!(a.as_str(), "-v" | "--verbose"))
        .map(|i| i + 1)
    else {
        return argv;
    };

    let leaves_alone = matches!(
        argv[first].as_str(),
        "-h" | "--help" | "-V" | "--version" | "help" | "report" | "adjust" | "sample"
    );
    if leaves_alone || !argv[first].starts_with('-') {
        return argv;
    }

    argv.insert(first, "report".to_string());
    argv
}
