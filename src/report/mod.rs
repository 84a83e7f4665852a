//! Reporting utilities: formatted terminal output for every table.

pub mod format;

pub use format::*;
