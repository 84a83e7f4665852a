//! Aggregation and the charge-off adjustment.
//!
//! Responsibilities:
//!
//! - rating x status counts and terminal outcome mixes (`aggregate`)
//! - recovery-adjusted default rates and risk ranking (`adjust`)
//! - mean borrower rate vs adjusted risk (`compare`)
//! - descriptive summaries of numeric fields (`describe`)

pub mod adjust;
pub mod aggregate;
pub mod compare;
pub mod describe;

pub use adjust::*;
pub use aggregate::*;
pub use compare::*;
pub use describe::*;
