//! CSV ingest and record validation.
//!
//! This module is responsible for turning a loan-book CSV into a clean set of
//! `LoanRecord`s that are safe to aggregate.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (no hidden randomness)
//! - **Separation of concerns**: no aggregation logic here

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::domain::{LoanRecord, LoanStatus, Rating};
use crate::error::{AppError, ValidationError};

const RATING_COLUMNS: &[&str] = &["rating", "prosperratingalpha", "prosperrating"];
const STATUS_COLUMNS: &[&str] = &["status", "loanstatus"];
const BORROWER_RATE_COLUMNS: &[&str] = &["borrowerrate"];
const DEFAULT_REASON_COLUMNS: &[&str] = &["defaultreason"];
const DAYS_PAST_DUE_COLUMNS: &[&str] = &["dayspastdue", "loancurrentdaysdelinquent"];
const FEES_PAID_COLUMNS: &[&str] = &["feespaid", "lpservicefees"];

/// Rejected-row examples carried in the "no valid records" error.
const NO_RECORDS_EXAMPLES: usize = 5;

/// One raw input row: normalized column name -> raw text.
///
/// Ordered and hashable so identical rows can be counted as duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawRow {
    fields: BTreeMap<String, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut row = Self::new();
        for (column, value) in pairs {
            row.insert(column, value);
        }
        row
    }

    pub fn insert(&mut self, column: &str, value: impl Into<String>) {
        self.fields.insert(normalize_header_name(column), value.into());
    }

    /// Trimmed value for `column`; blank cells read as absent.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(&normalize_header_name(column))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

/// A raw row tagged with its 1-based source line.
#[derive(Debug, Clone)]
pub struct SourceRow {
    pub line: usize,
    pub fields: RawRow,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Loader output: valid records + what was rejected and why.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub records: Vec<LoanRecord>,
    pub rejected: Vec<RowError>,
    pub rows_read: usize,
    /// Rows identical on every raw field to an earlier row. Counted, never dropped.
    pub duplicate_rows: usize,
}

impl LoadOutcome {
    pub fn rows_used(&self) -> usize {
        self.records.len()
    }
}

/// Parse a single raw row into a validated `LoanRecord`.
pub fn parse_record(row: &RawRow) -> Result<LoanRecord, ValidationError> {
    let rating: Rating = required(row, RATING_COLUMNS, "rating")?.parse()?;
    let status: LoanStatus = required(row, STATUS_COLUMNS, "status")?.parse()?;

    let rate_raw = required(row, BORROWER_RATE_COLUMNS, "borrower_rate")?;
    let borrower_rate = parse_f64("borrower_rate", rate_raw)?;
    if borrower_rate < 0.0 {
        return Err(ValidationError::InvalidField {
            field: "borrower_rate",
            value: rate_raw.to_string(),
            reason: "must be non-negative".to_string(),
        });
    }

    let default_reason = lookup(row, DEFAULT_REASON_COLUMNS).map(str::to_string);
    if let Some(reason) = &default_reason {
        if status != LoanStatus::Defaulted {
            return Err(ValidationError::ReasonWithoutDefault {
                reason: reason.clone(),
                status,
            });
        }
    }

    let days_past_due = match lookup(row, DAYS_PAST_DUE_COLUMNS) {
        Some(raw) => {
            let v = parse_f64("days_past_due", raw)?;
            if v < 0.0 {
                return Err(ValidationError::InvalidField {
                    field: "days_past_due",
                    value: raw.to_string(),
                    reason: "must be non-negative".to_string(),
                });
            }
            Some(v)
        }
        None => None,
    };

    let fees_paid = lookup(row, FEES_PAID_COLUMNS)
        .map(|raw| parse_f64("fees_paid", raw))
        .transpose()?;

    Ok(LoanRecord {
        rating,
        status,
        borrower_rate,
        default_reason,
        days_past_due,
        fees_paid,
    })
}

/// Validate every row, collecting failures instead of aborting.
///
/// A bad row never affects the others; it only shows up in `rejected`.
pub fn load_records<'a>(rows: impl IntoIterator<Item = &'a SourceRow>) -> LoadOutcome {
    let mut out = LoadOutcome::default();
    let mut seen: HashSet<&RawRow> = HashSet::new();

    for source in rows {
        out.rows_read += 1;
        if !seen.insert(&source.fields) {
            out.duplicate_rows += 1;
        }

        match parse_record(&source.fields) {
            Ok(record) => out.records.push(record),
            Err(e) => out.rejected.push(RowError {
                line: source.line,
                message: e.to_string(),
            }),
        }
    }

    out
}

/// Read a loan CSV into raw rows, keeping CSV-level parse failures as row errors.
pub fn read_source_rows(path: &Path) -> Result<(Vec<SourceRow>, Vec<RowError>), AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    ensure_required_columns_exist(&headers)?;

    let mut rows = Vec::new();
    let mut errors = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        // Quoted fields may span lines, so prefer the reader's own position.
        // Fallback: +2 because records() starts after the header and lines are 1-based.
        let position = match &result {
            Ok(record) => record.position(),
            Err(e) => e.position(),
        };
        let line = position.map_or(idx + 2, |p| p.line() as usize);
        match result {
            Ok(record) => rows.push(SourceRow {
                line,
                fields: raw_row_from_record(&headers, &record),
            }),
            Err(e) => errors.push(RowError {
                line,
                message: format!("CSV parse error: {e}"),
            }),
        }
    }

    debug!(rows = rows.len(), parse_errors = errors.len(), "read CSV");
    Ok((rows, errors))
}

/// Read and validate a loan CSV.
pub fn load_loan_csv(path: &Path) -> Result<LoadOutcome, AppError> {
    let (rows, parse_errors) = read_source_rows(path)?;
    let mut outcome = load_records(&rows);

    outcome.rows_read += parse_errors.len();
    outcome.rejected.extend(parse_errors);
    outcome.rejected.sort_by_key(|e| e.line);

    info!(
        rows_read = outcome.rows_read,
        rows_used = outcome.rows_used(),
        rejected = outcome.rejected.len(),
        "loaded loan records"
    );
    if outcome.duplicate_rows > 0 {
        warn!(duplicates = outcome.duplicate_rows, "input contains duplicate rows");
    }

    if outcome.records.is_empty() {
        return Err(AppError::new(3, no_records_message(&outcome.rejected)));
    }

    Ok(outcome)
}

fn no_records_message(rejected: &[RowError]) -> String {
    let mut msg = format!(
        "No valid loan records remain after validation ({} row(s) rejected).",
        rejected.len()
    );
    for e in rejected.iter().take(NO_RECORDS_EXAMPLES) {
        msg.push_str(&format!("\n  line {}: {}", e.line, e.message));
    }
    let hidden = rejected.len().saturating_sub(NO_RECORDS_EXAMPLES);
    if hidden > 0 {
        msg.push_str(&format!("\n  ... and {hidden} more"));
    }
    msg
}

fn raw_row_from_record(headers: &StringRecord, record: &StringRecord) -> RawRow {
    let mut row = RawRow::new();
    for (name, value) in headers.iter().zip(record.iter()) {
        row.insert(name, value);
    }
    row
}

fn ensure_required_columns_exist(headers: &StringRecord) -> Result<(), AppError> {
    let names: HashSet<String> = headers.iter().map(normalize_header_name).collect();
    for (label, aliases) in [
        ("rating", RATING_COLUMNS),
        ("status", STATUS_COLUMNS),
        ("borrower_rate", BORROWER_RATE_COLUMNS),
    ] {
        if !aliases.iter().any(|a| names.contains(*a)) {
            return Err(AppError::new(2, format!("Missing required column: `{label}`")));
        }
    }
    Ok(())
}

fn normalize_header_name(name: &str) -> String {
    // Excel exports often carry a BOM on the first header. Provider headers also
    // mix case and punctuation ("ProsperRating (Alpha)", "LP_ServiceFees").
    name.trim()
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn lookup<'a>(row: &'a RawRow, aliases: &[&str]) -> Option<&'a str> {
    aliases.iter().find_map(|a| row.get(a))
}

fn required<'a>(row: &'a RawRow, aliases: &[&str], field: &'static str) -> Result<&'a str, ValidationError> {
    lookup(row, aliases).ok_or(ValidationError::MissingField { field })
}

fn parse_f64(field: &'static str, raw: &str) -> Result<f64, ValidationError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ValidationError::InvalidField {
            field,
            value: raw.to_string(),
            reason: "expected a finite number".to_string(),
        }),
    }
}
