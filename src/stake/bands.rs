//! Risk-level banding policy.
//!
//! A recommendation's `risk_level` combines three independent signals,
//! each mapped to a band through documented cutoffs; the overall level is
//! the highest severity among them. Cutoffs are policy, loaded from
//! `[bands]` in the config, not hard-wired constants.
//!
//! Default cutoffs:
//!
//! | signal          | low           | medium          | high        |
//! |-----------------|---------------|-----------------|-------------|
//! | stake fraction  | f < 0.02      | 0.02 ≤ f < 0.05 | f ≥ 0.05    |
//! | probability     | p ≥ 0.65      | 0.45 ≤ p < 0.65 | p < 0.45    |
//! | odds            | [1.50, 4.00]  | [1.20, 6.00]    | outside     |
//!
//! The probability signal uses `min(probability, confidence)` when a
//! confidence score accompanies the estimate, so a shaky high-probability
//! estimate still bands as risky. Odds far from the middle of the book in
//! either direction raise variance, so both extremes band upward.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::types::RiskLevel;

/// Banding cutoffs. All comparisons are documented in the module header.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BandPolicy {
    /// Stake fractions at or above this band medium.
    pub stake_medium_floor: Decimal,
    /// Stake fractions at or above this band high.
    pub stake_high_floor: Decimal,
    /// Probabilities at or above this band low.
    pub prob_low_floor: Decimal,
    /// Probabilities at or above this band medium; below is high.
    pub prob_medium_floor: Decimal,
    /// Inclusive odds range banding low.
    pub odds_low_min: Decimal,
    pub odds_low_max: Decimal,
    /// Inclusive odds range banding medium; outside is high.
    pub odds_medium_min: Decimal,
    pub odds_medium_max: Decimal,
}

impl Default for BandPolicy {
    fn default() -> Self {
        Self {
            stake_medium_floor: dec!(0.02),
            stake_high_floor: dec!(0.05),
            prob_low_floor: dec!(0.65),
            prob_medium_floor: dec!(0.45),
            odds_low_min: dec!(1.50),
            odds_low_max: dec!(4.00),
            odds_medium_min: dec!(1.20),
            odds_medium_max: dec!(6.00),
        }
    }
}

impl BandPolicy {
    /// Band for the resulting stake fraction.
    pub fn stake_band(&self, fraction: Decimal) -> RiskLevel {
        if fraction >= self.stake_high_floor {
            RiskLevel::High
        } else if fraction >= self.stake_medium_floor {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Band for the probability/confidence signal.
    pub fn probability_band(&self, signal: Decimal) -> RiskLevel {
        if signal >= self.prob_low_floor {
            RiskLevel::Low
        } else if signal >= self.prob_medium_floor {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    /// Band for odds extremity.
    pub fn odds_band(&self, odds: Decimal) -> RiskLevel {
        if odds >= self.odds_low_min && odds <= self.odds_low_max {
            RiskLevel::Low
        } else if odds >= self.odds_medium_min && odds <= self.odds_medium_max {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    /// Overall risk level: the most severe of the three signals.
    pub fn classify(&self, stake_fraction: Decimal, signal: Decimal, odds: Decimal) -> RiskLevel {
        self.stake_band(stake_fraction)
            .max(self.probability_band(signal))
            .max(self.odds_band(odds))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
