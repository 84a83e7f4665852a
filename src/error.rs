use thiserror::Error;

use crate::domain::LoanStatus;

/// Malformed input or invalid configuration.
///
/// Raised per row by the loader (and collected) or once by the adjuster for
/// bad recovery bounds (and fatal).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing required value: `{field}`")]
    MissingField { field: &'static str },

    #[error("invalid `{field}` '{value}': {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("default reason '{reason}' on a {status} loan (only DEFAULTED loans carry one)")]
    ReasonWithoutDefault { reason: String, status: LoanStatus },

    #[error("recovery rate bound `{bound}` = {value} is outside [0, 1]")]
    RecoveryOutOfRange { bound: &'static str, value: f64 },

    #[error("recovery rate bounds must be non-decreasing (low={low}, mid={mid}, high={high})")]
    RecoveryNotMonotonic { low: f64, mid: f64, high: f64 },

    #[error("outcome proportions must lie in [0, 1] and sum to 1 (got {total})")]
    InvalidProportions { total: f64 },
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::new(2, format!("Invalid configuration: {err}"))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
