//! Input data sources beyond user-supplied CSVs.

pub mod sample;

pub use sample::{SampleConfig, SampleLoan, generate_sample, write_sample_csv};
