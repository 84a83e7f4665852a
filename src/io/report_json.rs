//! Read/write report JSON files.
//!
//! Report JSON is the "portable" representation of a run:
//! - run metadata (tool, generation time, source path)
//! - the configuration the tables were computed with
//! - load diagnostics (rows read/used/rejected, duplicates)
//! - every derived table
//!
//! It can be read back to diff runs against each other.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::pipeline::{ReportTables, RunOutput};
use crate::domain::ReportConfig;
use crate::error::AppError;

/// Load diagnostics carried in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub rows_read: usize,
    pub rows_used: usize,
    pub rows_rejected: usize,
    pub duplicate_rows: usize,
}

/// A saved report file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub source: PathBuf,
    pub config: ReportConfig,
    pub load: LoadSummary,
    pub tables: ReportTables,
}

impl ReportFile {
    pub fn from_run(run: &RunOutput, config: &ReportConfig) -> Self {
        Self {
            tool: "loanstats".to_string(),
            generated_at: Utc::now(),
            source: config.csv_path.clone(),
            config: config.clone(),
            load: LoadSummary {
                rows_read: run.load.rows_read,
                rows_used: run.load.rows_used(),
                rows_rejected: run.load.rejected.len(),
                duplicate_rows: run.load.duplicate_rows,
            },
            tables: run.tables.clone(),
        }
    }
}

/// Write a report JSON file.
pub fn write_report_json(path: &Path, report: &ReportFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create report JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(4, format!("Failed to write report JSON: {e}")))?;

    Ok(())
}

/// Read a report JSON file.
pub fn read_report_json(path: &Path) -> Result<ReportFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open report JSON '{}': {e}", path.display())))?;
    let report: ReportFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid report JSON: {e}")))?;
    Ok(report)
}
