//! Stake Calculator — probability/odds pair in, bounded stake out.
//!
//! Pure and side-effect-free: safe to invoke with unbounded parallelism.
//! The calculator never touches the ledger; the cap it applies here is
//! advisory for the caller, and the Ledger re-validates independently at
//! placement.

pub mod bands;
pub mod kelly;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::debug;

use crate::types::{Account, LedgerError, StakeRecommendation, StakingStrategy, Warning};
use bands::BandPolicy;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Calculator policy constants. These are engine-level policy rather than
/// per-account fields; accounts choose a strategy, the config decides what
/// the non-Kelly strategies mean.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    /// Constant fraction for `fixed_percentage`, applied regardless of edge.
    pub fixed_fraction: Decimal,
    /// Constant currency amount for `fixed_amount`.
    pub fixed_amount: Decimal,
    /// Baseline fraction for `confidence_scaled`, scaled by confidence.
    pub confidence_baseline_fraction: Decimal,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            fixed_fraction: dec!(0.02),
            fixed_amount: dec!(25),
            confidence_baseline_fraction: dec!(0.05),
        }
    }
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

pub struct StakeCalculator {
    config: CalculatorConfig,
    bands: BandPolicy,
}

impl Default for StakeCalculator {
    fn default() -> Self {
        Self::new(CalculatorConfig::default(), BandPolicy::default())
    }
}

impl StakeCalculator {
    pub fn new(config: CalculatorConfig, bands: BandPolicy) -> Self {
        Self { config, bands }
    }

    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    /// Compute a stake recommendation for one decision point.
    ///
    /// A zero-or-negative edge is not an error: the fraction is clamped to
    /// 0 and a `NegativeEdge` warning attached, so callers can still show
    /// the result. Validation failures (`p` outside (0,1), `o ≤ 1`) are
    /// errors and produce no recommendation.
    pub fn recommend(
        &self,
        account: &Account,
        probability: Decimal,
        odds: Decimal,
        confidence: Option<Decimal>,
    ) -> Result<StakeRecommendation, LedgerError> {
        if probability <= Decimal::ZERO || probability >= Decimal::ONE {
            return Err(LedgerError::InvalidProbability(probability));
        }
        if odds <= Decimal::ONE {
            return Err(LedgerError::InvalidOdds(odds));
        }

        let mut warnings = Vec::new();

        let (kelly, negative_edge) = kelly::clamped_kelly(probability, odds);
        if negative_edge {
            warnings.push(Warning::NegativeEdge);
        }

        // Balance available for scaling. Settlements can push the realized
        // balance to zero or below; the recommendation then bottoms out at 0
        // rather than going negative.
        let spendable = account.current_balance.max(Decimal::ZERO);

        let (computed_fraction, computed_amount) = match account.staking_strategy {
            StakingStrategy::KellyFull => (kelly, kelly * spendable),
            StakingStrategy::KellyFractional => {
                let f = kelly * account.risk_profile.kelly_multiplier();
                (f, f * spendable)
            }
            StakingStrategy::FixedPercentage => {
                let f = self.config.fixed_fraction;
                (f, f * spendable)
            }
            StakingStrategy::FixedAmount => {
                let amount = self.config.fixed_amount;
                // Equivalent fraction so the cap check below stays uniform.
                let f = if spendable > Decimal::ZERO {
                    amount / spendable
                } else {
                    Decimal::ZERO
                };
                (f, amount)
            }
            StakingStrategy::ConfidenceScaled => {
                let conf = confidence
                    .unwrap_or(dec!(0.5))
                    .clamp(Decimal::ZERO, Decimal::ONE);
                let f = self.config.confidence_baseline_fraction * conf;
                (f, f * spendable)
            }
        };

        let cap = account.max_stake();
        let capped_amount = computed_amount.min(cap);
        if capped_amount < computed_amount {
            warnings.push(Warning::StakeCapped {
                original: computed_amount,
                capped: capped_amount,
            });
        }

        let final_fraction = if spendable > Decimal::ZERO {
            capped_amount / spendable
        } else {
            Decimal::ZERO
        };
        // Signal quality: a shaky confidence score drags a confident
        // probability down, never up.
        let signal = match confidence {
            Some(c) => probability.min(c),
            None => probability,
        };
        let risk_level = self.bands.classify(final_fraction, signal, odds);

        debug!(
            account_id = %account.id,
            strategy = %account.staking_strategy,
            probability = %probability,
            odds = %odds,
            fraction = %computed_fraction,
            amount = %capped_amount,
            risk = %risk_level,
            "Stake recommended"
        );

        Ok(StakeRecommendation {
            probability,
            odds,
            strategy: account.staking_strategy,
            computed_fraction,
            computed_amount,
            capped_amount,
            risk_level,
            warnings,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RiskLevel, RiskProfile};
    use chrono::Utc;

    fn account(
        balance: Decimal,
        profile: RiskProfile,
        strategy: StakingStrategy,
        max_stake_fraction: Decimal,
    ) -> Account {
        let now = Utc::now();
        Account {
            id: "owner-1".to_string(),
            currency: "EUR".to_string(),
            initial_balance: balance,
            current_balance: balance,
            risk_profile: profile,
            staking_strategy: strategy,
            max_stake_fraction,
            daily_loss_limit: None,
            weekly_loss_limit: None,
            daily_loss_accrued: Decimal::ZERO,
            weekly_loss_accrued: Decimal::ZERO,
            day_anchor: now,
            week_anchor: now,
            created_at: now,
        }
    }

    fn calc() -> StakeCalculator {
        StakeCalculator::default()
    }

    #[test]
    fn test_reference_scenario_balanced_fractional() {
        // balance=1000, p=0.50, o=2.50, balanced (multiplier 0.25):
        // full Kelly (1.5·0.5−0.5)/1.5 = 0.1667 → fractional 0.04167 → ≈ 41.67
        let acct = account(
            dec!(1000),
            RiskProfile::Balanced,
            StakingStrategy::KellyFractional,
            dec!(0.10),
        );
        let rec = calc()
            .recommend(&acct, dec!(0.50), dec!(2.50), None)
            .unwrap();
        assert_eq!(rec.capped_amount.round_dp(2), dec!(41.67));
        assert!(!rec.was_capped());
        assert!(!rec.has_negative_edge());
    }

    #[test]
    fn test_full_kelly_uses_raw_fraction() {
        let acct = account(
            dec!(1000),
            RiskProfile::Aggressive,
            StakingStrategy::KellyFull,
            dec!(0.25),
        );
        let rec = calc()
            .recommend(&acct, dec!(0.50), dec!(2.50), None)
            .unwrap();
        // 0.1667 × 1000, under the 25% cap
        assert_eq!(rec.capped_amount.round_dp(2), dec!(166.67));
    }

    #[test]
    fn test_profile_multipliers_order_stakes() {
        let mk = |profile| {
            let acct = account(
                dec!(1000),
                profile,
                StakingStrategy::KellyFractional,
                dec!(0.25),
            );
            calc()
                .recommend(&acct, dec!(0.55), dec!(2.20), None)
                .unwrap()
                .capped_amount
        };
        let conservative = mk(RiskProfile::Conservative);
        let balanced = mk(RiskProfile::Balanced);
        let aggressive = mk(RiskProfile::Aggressive);
        assert!(conservative < balanced);
        assert!(balanced < aggressive);
    }

    #[test]
    fn test_negative_edge_clamps_to_zero_with_warning() {
        let acct = account(
            dec!(1000),
            RiskProfile::Balanced,
            StakingStrategy::KellyFull,
            dec!(0.10),
        );
        // p=0.30 at o=2.0 is a losing bet
        let rec = calc()
            .recommend(&acct, dec!(0.30), dec!(2.0), None)
            .unwrap();
        assert_eq!(rec.computed_fraction, Decimal::ZERO);
        assert_eq!(rec.capped_amount, Decimal::ZERO);
        assert!(rec.has_negative_edge());
    }

    #[test]
    fn test_fixed_percentage_ignores_edge_sign() {
        let acct = account(
            dec!(1000),
            RiskProfile::Balanced,
            StakingStrategy::FixedPercentage,
            dec!(0.10),
        );
        // Negative edge, but fixed_percentage stakes 2% regardless
        let rec = calc()
            .recommend(&acct, dec!(0.30), dec!(2.0), None)
            .unwrap();
        assert_eq!(rec.capped_amount, dec!(20.00));
        // The informational warning is still attached
        assert!(rec.has_negative_edge());
    }

    #[test]
    fn test_fixed_amount_converts_to_fraction_for_cap() {
        let acct = account(
            dec!(100),
            RiskProfile::Balanced,
            StakingStrategy::FixedAmount,
            dec!(0.10),
        );
        // Fixed 25 against a 10-unit cap (10% of 100) → capped
        let rec = calc()
            .recommend(&acct, dec!(0.55), dec!(2.0), None)
            .unwrap();
        assert_eq!(rec.computed_amount, dec!(25));
        assert_eq!(rec.capped_amount, dec!(10.00));
        assert!(rec.was_capped());
        assert_eq!(rec.computed_fraction, dec!(0.25));
    }

    #[test]
    fn test_fixed_amount_zero_balance() {
        let mut acct = account(
            dec!(100),
            RiskProfile::Balanced,
            StakingStrategy::FixedAmount,
            dec!(0.10),
        );
        acct.current_balance = Decimal::ZERO;
        let rec = calc()
            .recommend(&acct, dec!(0.55), dec!(2.0), None)
            .unwrap();
        assert_eq!(rec.computed_fraction, Decimal::ZERO);
        assert_eq!(rec.capped_amount, Decimal::ZERO);
        assert!(rec.was_capped());
    }

    #[test]
    fn test_confidence_scaled_linear() {
        let acct = account(
            dec!(1000),
            RiskProfile::Balanced,
            StakingStrategy::ConfidenceScaled,
            dec!(0.10),
        );
        let c = calc();
        let full = c
            .recommend(&acct, dec!(0.55), dec!(2.0), Some(dec!(1.0)))
            .unwrap();
        let half = c
            .recommend(&acct, dec!(0.55), dec!(2.0), Some(dec!(0.5)))
            .unwrap();
        // baseline 0.05 × 1000 = 50 at full confidence, 25 at half
        assert_eq!(full.capped_amount, dec!(50.00));
        assert_eq!(half.capped_amount, dec!(25.000));

        // Missing confidence is treated as neutral 0.5
        let default = c.recommend(&acct, dec!(0.55), dec!(2.0), None).unwrap();
        assert_eq!(default.capped_amount, half.capped_amount);
    }

    #[test]
    fn test_confidence_clamped_to_unit_interval() {
        let acct = account(
            dec!(1000),
            RiskProfile::Balanced,
            StakingStrategy::ConfidenceScaled,
            dec!(0.10),
        );
        let rec = calc()
            .recommend(&acct, dec!(0.55), dec!(2.0), Some(dec!(3.0)))
            .unwrap();
        assert_eq!(rec.capped_amount, dec!(50.00));
    }

    #[test]
    fn test_cap_reduces_and_warns() {
        let acct = account(
            dec!(1000),
            RiskProfile::Aggressive,
            StakingStrategy::KellyFull,
            dec!(0.05),
        );
        // Huge edge: full Kelly ≈ 0.40 of bankroll, capped at 5%
        let rec = calc()
            .recommend(&acct, dec!(0.70), dec!(2.0), None)
            .unwrap();
        assert_eq!(rec.capped_amount, dec!(50.00));
        assert!(rec.was_capped());
        match &rec.warnings[0] {
            Warning::StakeCapped { original, capped } => {
                assert_eq!(original.round_dp(2), dec!(400.00));
                assert_eq!(*capped, dec!(50.00));
            }
            other => panic!("expected StakeCapped, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_probability_rejected() {
        let acct = account(
            dec!(1000),
            RiskProfile::Balanced,
            StakingStrategy::KellyFull,
            dec!(0.10),
        );
        let c = calc();
        for p in [dec!(0), dec!(1), dec!(1.2), dec!(-0.1)] {
            let err = c.recommend(&acct, p, dec!(2.0), None).unwrap_err();
            assert_eq!(err, LedgerError::InvalidProbability(p));
        }
    }

    #[test]
    fn test_degenerate_odds_rejected() {
        let acct = account(
            dec!(1000),
            RiskProfile::Balanced,
            StakingStrategy::KellyFull,
            dec!(0.10),
        );
        let c = calc();
        for o in [dec!(1.0), dec!(0.9), dec!(0)] {
            let err = c.recommend(&acct, dec!(0.5), o, None).unwrap_err();
            assert_eq!(err, LedgerError::InvalidOdds(o));
        }
    }

    #[test]
    fn test_risk_level_reference_points() {
        let c = calc();
        // Scenario A lands medium: fraction 0.0417, probability 0.50, odds 2.50
        let acct = account(
            dec!(1000),
            RiskProfile::Balanced,
            StakingStrategy::KellyFractional,
            dec!(0.10),
        );
        let rec = c.recommend(&acct, dec!(0.50), dec!(2.50), None).unwrap();
        assert_eq!(rec.risk_level, RiskLevel::Medium);

        // Small fixed stake, confident estimate, middling odds → low
        let acct = account(
            dec!(10000),
            RiskProfile::Conservative,
            StakingStrategy::FixedAmount,
            dec!(0.10),
        );
        let rec = c.recommend(&acct, dec!(0.70), dec!(2.0), None).unwrap();
        assert_eq!(rec.risk_level, RiskLevel::Low);

        // Longshot odds dominate everything else
        let rec = c.recommend(&acct, dec!(0.70), dec!(9.0), None).unwrap();
        assert_eq!(rec.risk_level, RiskLevel::High);
    }
}
