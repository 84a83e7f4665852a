//! `loan-stats` library crate.
//!
//! The binary (`loanstats`) is a thin wrapper around this library so that:
//!
//! - the aggregation and adjustment code is testable without spawning processes
//! - every table can be rebuilt from an in-memory record list
//!
//! Data flows one way: `io::ingest` -> `stats` -> `report` / `io::export`.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
pub mod stats;
