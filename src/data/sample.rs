//! Synthetic loan book generation.
//!
//! Produces a seeded, provider-shaped CSV so the report can be exercised
//! without the real dataset. Per-rating profiles set the share of the book,
//! the borrower-rate level, and the terminal outcome mix.

use std::collections::hash_map::DefaultHasher;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::path::Path;

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::Serialize;
use tracing::info;

use crate::domain::{LoanStatus, Rating};
use crate::error::AppError;

/// Share of loans still running, across all ratings.
const CURRENT_SHARE: f64 = 0.55;

/// Share of running loans that are behind on payments.
const PAST_DUE_SHARE: f64 = 0.08;

const DEFAULT_REASONS: [&str; 4] = ["Delinquency", "Bankruptcy", "Deceased", "Fraud"];
const DEFAULT_REASON_WEIGHTS: [u32; 4] = [80, 12, 5, 3];

#[derive(Debug, Clone, Copy)]
struct RatingProfile {
    rating: Rating,
    book_share: f64,
    rate_mean: f64,
    rate_sd: f64,
    // Terminal mix: (defaulted, chargeoff, completed).
    outcomes: (f64, f64, f64),
}

const PROFILES: [RatingProfile; 7] = [
    RatingProfile { rating: Rating::AA, book_share: 0.06, rate_mean: 0.075, rate_sd: 0.015, outcomes: (0.01, 0.03, 0.96) },
    RatingProfile { rating: Rating::A, book_share: 0.15, rate_mean: 0.110, rate_sd: 0.020, outcomes: (0.015, 0.05, 0.935) },
    RatingProfile { rating: Rating::B, book_share: 0.18, rate_mean: 0.155, rate_sd: 0.020, outcomes: (0.02, 0.09, 0.89) },
    RatingProfile { rating: Rating::C, book_share: 0.22, rate_mean: 0.195, rate_sd: 0.025, outcomes: (0.02, 0.21, 0.77) },
    RatingProfile { rating: Rating::D, book_share: 0.17, rate_mean: 0.245, rate_sd: 0.030, outcomes: (0.03, 0.26, 0.71) },
    RatingProfile { rating: Rating::E, book_share: 0.12, rate_mean: 0.290, rate_sd: 0.030, outcomes: (0.04, 0.33, 0.63) },
    RatingProfile { rating: Rating::HR, book_share: 0.10, rate_mean: 0.320, rate_sd: 0.035, outcomes: (0.05, 0.29, 0.66) },
];

/// Parameters for a synthetic book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleConfig {
    pub rows: usize,
    pub seed: u64,
}

/// One synthetic loan, in the provider's column vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleLoan {
    #[serde(rename = "ListingKey")]
    pub listing_key: String,
    #[serde(rename = "ProsperRating (Alpha)")]
    pub rating: String,
    #[serde(rename = "LoanStatus")]
    pub status: String,
    #[serde(rename = "BorrowerRate")]
    pub borrower_rate: f64,
    #[serde(rename = "DefaultReason")]
    pub default_reason: Option<String>,
    #[serde(rename = "LoanCurrentDaysDelinquent")]
    pub days_past_due: u32,
    #[serde(rename = "LP_ServiceFees")]
    pub fees_paid: f64,
}

pub fn generate_sample(config: &SampleConfig) -> Result<Vec<SampleLoan>, AppError> {
    if config.rows == 0 {
        return Err(AppError::new(2, "Sample row count must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(sample_seed(config));
    let rating_pick = WeightedIndex::new(PROFILES.iter().map(|p| p.book_share))
        .map_err(|e| AppError::new(4, format!("Rating mix error: {e}")))?;
    let reason_pick = WeightedIndex::new(DEFAULT_REASON_WEIGHTS)
        .map_err(|e| AppError::new(4, format!("Default reason mix error: {e}")))?;

    let mut loans = Vec::with_capacity(config.rows);
    for i in 0..config.rows {
        let profile = PROFILES[rating_pick.sample(&mut rng)];
        let status = sample_status(&mut rng, &profile)?;

        let noise = Normal::new(profile.rate_mean, profile.rate_sd)
            .map_err(|e| AppError::new(4, format!("Rate distribution error: {e}")))?;
        let rate = noise.sample(&mut rng).clamp(0.01, 0.36);
        let borrower_rate = (rate * 10_000.0).round() / 10_000.0;

        let (status_text, days_past_due) = match status {
            LoanStatus::Current if rng.gen_bool(PAST_DUE_SHARE) => {
                let days: u32 = rng.gen_range(1..=120);
                (past_due_bucket(days).to_string(), days)
            }
            LoanStatus::Current => ("Current".to_string(), 0),
            LoanStatus::Completed => ("Completed".to_string(), 0),
            LoanStatus::Defaulted => ("Defaulted".to_string(), 0),
            LoanStatus::Chargeoff => ("Chargedoff".to_string(), 0),
        };

        let default_reason = match status {
            LoanStatus::Defaulted => Some(DEFAULT_REASONS[reason_pick.sample(&mut rng)].to_string()),
            _ => None,
        };

        let fees: f64 = rng.gen_range(0.0..200.0);

        loans.push(SampleLoan {
            listing_key: format!("L{:07}", i + 1),
            rating: profile.rating.code().to_string(),
            status: status_text,
            borrower_rate,
            default_reason,
            days_past_due,
            fees_paid: -(fees * 100.0).round() / 100.0,
        });
    }

    Ok(loans)
}

/// Write a synthetic book to CSV.
pub fn write_sample_csv(path: &Path, loans: &[SampleLoan]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create sample CSV '{}': {e}", path.display())))?;
    let mut wtr = csv::Writer::from_writer(file);
    for loan in loans {
        wtr.serialize(loan)
            .map_err(|e| AppError::new(4, format!("Failed to write sample CSV row: {e}")))?;
    }
    wtr.flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush sample CSV: {e}")))?;

    info!(path = %path.display(), rows = loans.len(), "wrote synthetic loan book");
    Ok(())
}

fn sample_status(rng: &mut StdRng, profile: &RatingProfile) -> Result<LoanStatus, AppError> {
    if rng.gen_bool(CURRENT_SHARE) {
        return Ok(LoanStatus::Current);
    }
    let (d, c, k) = profile.outcomes;
    let pick = WeightedIndex::new([d, c, k])
        .map_err(|e| AppError::new(4, format!("Outcome mix error: {e}")))?;
    Ok([LoanStatus::Defaulted, LoanStatus::Chargeoff, LoanStatus::Completed][pick.sample(rng)])
}

fn past_due_bucket(days: u32) -> &'static str {
    match days {
        0..=15 => "Past Due (1-15 days)",
        16..=30 => "Past Due (16-30 days)",
        31..=60 => "Past Due (31-60 days)",
        61..=90 => "Past Due (61-90 days)",
        _ => "Past Due (91-120 days)",
    }
}

fn sample_seed(config: &SampleConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.seed.hash(&mut hasher);
    config.rows.hash(&mut hasher);
    hasher.finish()
}
