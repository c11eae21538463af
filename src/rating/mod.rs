//! Rating engine: Elo deltas and rank tiers
//!
//! Pure functions with no side effects; settlement applies the results to
//! durable user records.

pub mod elo;
pub mod tier;

// Re-export commonly used types
pub use elo::{
    expected_score, rating_delta, EloCalculator, EloConfig, Outcome, SettlementDelta,
    DEFAULT_K_FACTOR, DEFAULT_RATING,
};
pub use tier::RankTier;
