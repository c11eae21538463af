//! Elo rating engine
//!
//! Expected scores come from the skillratings crate; deltas are rounded to
//! whole rating points. Every delta is computed from a single canonical
//! perspective and negated for the other side, so rating transfer is always
//! zero-sum.

use crate::error::ArenaError;
use serde::{Deserialize, Serialize};
use skillratings::elo::EloRating;

/// Starting rating for players without a record
pub const DEFAULT_RATING: i32 = 1200;

/// Default k-factor
pub const DEFAULT_K_FACTOR: f64 = 32.0;

/// Game outcome from one player's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    /// Actual score: 1 for a win, 0.5 for a draw, 0 for a loss
    pub fn score(self) -> f64 {
        match self {
            Outcome::Win => 1.0,
            Outcome::Draw => 0.5,
            Outcome::Loss => 0.0,
        }
    }
}

/// Expected score of `rating_a` against `rating_b`:
/// `1 / (1 + 10^((b - a) / 400))`
pub fn expected_score(rating_a: i32, rating_b: i32) -> f64 {
    let (expected_a, _) = skillratings::elo::expected_score(
        &EloRating {
            rating: f64::from(rating_a),
        },
        &EloRating {
            rating: f64::from(rating_b),
        },
    );
    expected_a
}

/// Signed rating change for player A.
///
/// `delta(a, b, Win, k) == -delta(b, a, Loss, k)` holds exactly: a loss is
/// evaluated as the negated win of the opponent, and draws are evaluated from
/// the lower-rated side.
pub fn rating_delta(rating_a: i32, rating_b: i32, outcome: Outcome, k_factor: f64) -> i32 {
    match outcome {
        Outcome::Win => raw_delta(rating_a, rating_b, Outcome::Win, k_factor),
        Outcome::Loss => -raw_delta(rating_b, rating_a, Outcome::Win, k_factor),
        Outcome::Draw if rating_a <= rating_b => {
            raw_delta(rating_a, rating_b, Outcome::Draw, k_factor)
        }
        Outcome::Draw => -raw_delta(rating_b, rating_a, Outcome::Draw, k_factor),
    }
}

fn raw_delta(rating_a: i32, rating_b: i32, outcome: Outcome, k_factor: f64) -> i32 {
    let expected = expected_score(rating_a, rating_b);
    (k_factor * (outcome.score() - expected)).round() as i32
}

/// Rating changes applied at settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementDelta {
    pub winner: i32,
    pub loser: i32,
}

/// Elo configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EloConfig {
    pub k_factor: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            k_factor: DEFAULT_K_FACTOR,
        }
    }
}

impl EloConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.k_factor.is_nan() || self.k_factor <= 0.0 {
            return Err(ArenaError::ConfigurationError {
                message: "K-factor must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Elo calculator bound to one k-factor
#[derive(Debug, Clone)]
pub struct EloCalculator {
    config: EloConfig,
}

impl EloCalculator {
    /// Create a new Elo calculator
    pub fn new(config: EloConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Delta for player A given the outcome from A's perspective
    pub fn delta(&self, rating_a: i32, rating_b: i32, outcome: Outcome) -> i32 {
        rating_delta(rating_a, rating_b, outcome, self.config.k_factor)
    }

    /// Winner and loser deltas for a decided game.
    /// The loser's delta is the negated winner's delta.
    pub fn settle(&self, winner_rating: i32, loser_rating: i32) -> SettlementDelta {
        let winner = self.delta(winner_rating, loser_rating, Outcome::Win);
        SettlementDelta {
            winner,
            loser: -winner,
        }
    }
}

impl Default for EloCalculator {
    fn default() -> Self {
        Self {
            config: EloConfig::default(),
        }
    }
}
