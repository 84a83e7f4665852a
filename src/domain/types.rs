//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during aggregation
//! - exported to JSON/CSV
//! - reloaded later for comparisons between runs

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Ordinal borrower-risk grade.
///
/// Declaration order is the risk order (`AA` lowest risk, `HR` highest), so the
/// derived `Ord` doubles as the tie-break order for every ranked table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rating {
    AA,
    A,
    B,
    C,
    D,
    E,
    HR,
}

impl Rating {
    pub const ALL: [Rating; 7] = [
        Rating::AA,
        Rating::A,
        Rating::B,
        Rating::C,
        Rating::D,
        Rating::E,
        Rating::HR,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Rating::AA => "AA",
            Rating::A => "A",
            Rating::B => "B",
            Rating::C => "C",
            Rating::D => "D",
            Rating::E => "E",
            Rating::HR => "HR",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Rating {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Rating::ALL
            .into_iter()
            .find(|r| r.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| ValidationError::InvalidField {
                field: "rating",
                value: s.to_string(),
                reason: "expected one of AA, A, B, C, D, E, HR".to_string(),
            })
    }
}

/// Loan status collapsed onto the four categories the report cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanStatus {
    Current,
    Completed,
    Defaulted,
    Chargeoff,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 4] = [
        LoanStatus::Current,
        LoanStatus::Completed,
        LoanStatus::Defaulted,
        LoanStatus::Chargeoff,
    ];

    /// Terminal outcomes will not change any more; `Current` loans are still running.
    pub fn is_terminal(self) -> bool {
        !matches!(self, LoanStatus::Current)
    }

    pub fn code(self) -> &'static str {
        match self {
            LoanStatus::Current => "CURRENT",
            LoanStatus::Completed => "COMPLETED",
            LoanStatus::Defaulted => "DEFAULTED",
            LoanStatus::Chargeoff => "CHARGEOFF",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for LoanStatus {
    type Err = ValidationError;

    /// Match the provider's textual status codes (case-insensitive).
    ///
    /// `Past Due (...)` and `FinalPaymentInProgress` are still-running loans and
    /// collapse onto `Current`. Anything else, `Cancelled` included, is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        let status = match key.as_str() {
            "current" | "finalpaymentinprogress" => LoanStatus::Current,
            k if k.starts_with("pastdue") => LoanStatus::Current,
            "completed" => LoanStatus::Completed,
            "defaulted" => LoanStatus::Defaulted,
            "chargedoff" | "chargeoff" => LoanStatus::Chargeoff,
            _ => {
                return Err(ValidationError::InvalidField {
                    field: "status",
                    value: s.to_string(),
                    reason: "not a recognised loan status".to_string(),
                });
            }
        };
        Ok(status)
    }
}

/// One originated loan, after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanRecord {
    pub rating: Rating,
    pub status: LoanStatus,
    /// Annualized borrower interest rate as a fraction (`0.158` = 15.8%).
    pub borrower_rate: f64,
    /// Only ever `Some` on a `Defaulted` loan.
    pub default_reason: Option<String>,
    /// Descriptive only; not used by the adjustment.
    pub days_past_due: Option<f64>,
    /// Descriptive only; not used by the adjustment.
    pub fees_paid: Option<f64>,
}

/// Terminal outcome mix for one rating.
///
/// Only produced for ratings with at least one terminal loan; a rating with no
/// terminal loans has no `SegmentFrequency` at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentFrequency {
    pub rating: Rating,
    pub n_defaulted: usize,
    pub n_chargeoff: usize,
    pub n_completed: usize,
    pub p_defaulted: f64,
    pub p_chargeoff: f64,
    pub p_completed: f64,
}

impl SegmentFrequency {
    /// Build from terminal counts. Returns `None` when all counts are zero.
    pub fn from_counts(rating: Rating, n_defaulted: usize, n_chargeoff: usize, n_completed: usize) -> Option<Self> {
        let n = n_defaulted + n_chargeoff + n_completed;
        if n == 0 {
            return None;
        }
        let n_f = n as f64;
        Some(Self {
            rating,
            n_defaulted,
            n_chargeoff,
            n_completed,
            p_defaulted: n_defaulted as f64 / n_f,
            p_chargeoff: n_chargeoff as f64 / n_f,
            p_completed: n_completed as f64 / n_f,
        })
    }

    /// Build directly from proportions (counts are left at zero).
    pub fn from_proportions(rating: Rating, p_defaulted: f64, p_chargeoff: f64, p_completed: f64) -> Self {
        Self {
            rating,
            n_defaulted: 0,
            n_chargeoff: 0,
            n_completed: 0,
            p_defaulted,
            p_chargeoff,
            p_completed,
        }
    }

    pub fn n_terminal(&self) -> usize {
        self.n_defaulted + self.n_chargeoff + self.n_completed
    }

    pub fn total(&self) -> f64 {
        self.p_defaulted + self.p_chargeoff + self.p_completed
    }
}

/// Adjusted outcome split for one rating at one recovery rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustedSegmentRate {
    pub rating: Rating,
    pub recovery_rate: f64,
    pub p_completed_adj: f64,
    pub p_defaulted_adj: f64,
}

/// One row of the adjusted-rate table (all three recovery bounds side by side).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustedRateRow {
    pub rating: Rating,
    pub defaulted_raw: f64,
    pub completed_low: f64,
    pub completed_mid: f64,
    pub completed_high: f64,
    pub defaulted_low: f64,
    pub defaulted_mid: f64,
    pub defaulted_high: f64,
}

/// Recovery-rate interval for charged-off balances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoveryBounds {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

impl Default for RecoveryBounds {
    /// 9.5% ± 2.5%.
    fn default() -> Self {
        Self {
            low: 0.07,
            mid: 0.095,
            high: 0.12,
        }
    }
}

impl RecoveryBounds {
    /// Build and validate a bounds triple.
    pub fn new(low: f64, mid: f64, high: f64) -> Result<Self, ValidationError> {
        let bounds = Self { low, mid, high };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Express a point estimate with a symmetric margin, e.g. `9.5% ± 2.5%`.
    pub fn from_estimate(center: f64, half_width: f64) -> Result<Self, ValidationError> {
        Self::new(center - half_width, center, center + half_width)
    }

    /// Each bound must lie in `[0, 1]` and `low <= mid <= high`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (bound, value) in [("low", self.low), ("mid", self.mid), ("high", self.high)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::RecoveryOutOfRange { bound, value });
            }
        }
        if !(self.low <= self.mid && self.mid <= self.high) {
            return Err(ValidationError::RecoveryNotMonotonic {
                low: self.low,
                mid: self.mid,
                high: self.high,
            });
        }
        Ok(())
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.low, self.mid, self.high]
    }
}

/// Mean borrower rate for one rating, annotated against the adjusted-risk order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateComparisonRow {
    pub rating: Rating,
    pub n_loans: usize,
    pub mean_borrower_rate: f64,
    /// 1 = highest mean rate. `None` when the rating has no adjusted row.
    pub reward_rank: Option<usize>,
    /// 1 = highest `defaulted_mid`, i.e. the rank the reward "should" have.
    pub risk_rank: Option<usize>,
    /// `None` means insufficient terminal data to judge.
    pub mismatch: Option<bool>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags, the environment, and defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub csv_path: PathBuf,
    pub recovery: RecoveryBounds,
    /// Minimum rank gap (exclusive) before a rating is flagged. `0` flags any inversion.
    pub mismatch_threshold: usize,
    /// Number of rejected-row examples to show.
    pub error_examples: usize,
    pub export_dir: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

impl ReportConfig {
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            recovery: RecoveryBounds::default(),
            mismatch_threshold: 0,
            error_examples: 5,
            export_dir: None,
            export_json: None,
        }
    }
}
