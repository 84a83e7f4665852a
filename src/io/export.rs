//! Export report tables to CSV.
//!
//! Each table becomes one flat CSV keyed by rating, easy to consume in
//! spreadsheets or downstream scripts.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::app::pipeline::ReportTables;
use crate::domain::LoanStatus;
use crate::error::AppError;
use crate::stats::StatusCrosstab;

pub const FREQUENCIES_FILE: &str = "segment_frequencies.csv";
pub const ADJUSTED_FILE: &str = "adjusted_rates.csv";
pub const COMPARISON_FILE: &str = "rate_comparison.csv";
pub const CROSSTAB_FILE: &str = "status_crosstab.csv";

/// Write every table into `dir`, returning the files written.
pub fn write_tables_csv(dir: &Path, tables: &ReportTables) -> Result<Vec<PathBuf>, AppError> {
    create_dir_all(dir)
        .map_err(|e| AppError::new(4, format!("Failed to create export dir '{}': {e}", dir.display())))?;

    let written = vec![
        write_rows(&dir.join(FREQUENCIES_FILE), tables.frequencies.values())?,
        write_rows(&dir.join(ADJUSTED_FILE), tables.adjusted.iter())?,
        write_rows(&dir.join(COMPARISON_FILE), tables.comparison.rows.iter())?,
        write_crosstab(&dir.join(CROSSTAB_FILE), &tables.crosstab)?,
    ];

    info!(dir = %dir.display(), files = written.len(), "exported CSV tables");
    Ok(written)
}

fn write_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<PathBuf, AppError> {
    let mut wtr = open_writer(path)?;
    for row in rows {
        wtr.serialize(row)
            .map_err(|e| AppError::new(4, format!("Failed to write '{}': {e}", path.display())))?;
    }
    wtr.flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush '{}': {e}", path.display())))?;
    Ok(path.to_path_buf())
}

fn write_crosstab(path: &Path, table: &StatusCrosstab) -> Result<PathBuf, AppError> {
    let mut wtr = open_writer(path)?;
    let write_err = |e: csv::Error| AppError::new(4, format!("Failed to write '{}': {e}", path.display()));

    let mut header = vec!["rating".to_string()];
    header.extend(LoanStatus::ALL.iter().map(|s| s.code().to_string()));
    header.push("total".to_string());
    wtr.write_record(&header).map_err(write_err)?;

    for rating in table.ratings() {
        let mut record = vec![rating.code().to_string()];
        record.extend(LoanStatus::ALL.iter().map(|&s| table.count(rating, s).to_string()));
        record.push(table.rating_total(rating).to_string());
        wtr.write_record(&record).map_err(write_err)?;
    }

    let mut totals = vec!["total".to_string()];
    totals.extend(LoanStatus::ALL.iter().map(|&s| table.status_total(s).to_string()));
    totals.push(table.total().to_string());
    wtr.write_record(&totals).map_err(write_err)?;

    wtr.flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush '{}': {e}", path.display())))?;
    Ok(path.to_path_buf())
}

fn open_writer(path: &Path) -> Result<csv::Writer<File>, AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    Ok(csv::Writer::from_writer(file))
}
