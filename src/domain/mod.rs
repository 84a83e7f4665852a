//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the closed enumerations (`Rating`, `LoanStatus`)
//! - validated loan records (`LoanRecord`)
//! - derived tables (`SegmentFrequency`, `AdjustedRateRow`, `RateComparisonRow`)
//! - run configuration (`RecoveryBounds`, `ReportConfig`)

pub mod types;

pub use types::*;
