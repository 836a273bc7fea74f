//! Kelly criterion core.
//!
//! The raw growth-optimal fraction for a bet at decimal odds `o` with win
//! probability `p`:
//!
//!   b = o − 1 (net odds), q = 1 − p
//!   f* = (b·p − q) / b
//!
//! Strategy transforms and caps are applied on top of this by the
//! calculator; this module is only the formula.

use rust_decimal::Decimal;

/// Raw full-Kelly fraction. May be negative or zero when the edge does not
/// justify the odds; callers clamp and attach the `NegativeEdge` warning.
///
/// Inputs must already be validated (`0 < p < 1`, `o > 1`), so `b > 0` and
/// the division is well-defined.
pub fn full_kelly(probability: Decimal, odds: Decimal) -> Decimal {
    let b = odds - Decimal::ONE;
    let q = Decimal::ONE - probability;
    (b * probability - q) / b
}

/// `full_kelly` clamped at zero. Returns the clamped fraction and whether
/// clamping occurred (a zero-or-negative edge).
pub fn clamped_kelly(probability: Decimal, odds: Decimal) -> (Decimal, bool) {
    let raw = full_kelly(probability, odds);
    if raw <= Decimal::ZERO {
        (Decimal::ZERO, true)
    } else {
        (raw, false)
    }
}

/// Probability implied by decimal odds (`1/o`). The edge is the gap between
/// the estimated win probability and this value.
pub fn implied_probability(odds: Decimal) -> Decimal {
    Decimal::ONE / odds
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
