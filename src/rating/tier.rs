//! Rank tiers derived from a rating

use serde::{Deserialize, Serialize};

/// Display rank of a player, recomputed after every settled game
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RankTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl RankTier {
    /// Fixed thresholds: 2000 Diamond, 1800 Platinum, 1600 Gold, 1400 Silver
    pub fn from_rating(rating: i32) -> Self {
        match rating {
            r if r >= 2000 => RankTier::Diamond,
            r if r >= 1800 => RankTier::Platinum,
            r if r >= 1600 => RankTier::Gold,
            r if r >= 1400 => RankTier::Silver,
            _ => RankTier::Bronze,
        }
    }
}

impl Default for RankTier {
    fn default() -> Self {
        RankTier::Bronze
    }
}

impl std::fmt::Display for RankTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankTier::Bronze => write!(f, "Bronze"),
            RankTier::Silver => write!(f, "Silver"),
            RankTier::Gold => write!(f, "Gold"),
            RankTier::Platinum => write!(f, "Platinum"),
            RankTier::Diamond => write!(f, "Diamond"),
        }
    }
}
