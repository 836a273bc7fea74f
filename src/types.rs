//! Shared types for the STAKEGUARD engine.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that the calculator, ledger,
//! and API modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Account risk profile. Drives the fractional-Kelly multiplier and is
/// surfaced to the caller for transparency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    Conservative,
    Balanced,
    Aggressive,
}

impl RiskProfile {
    /// Fractional-Kelly multiplier for the `kelly_fractional` strategy.
    pub fn kelly_multiplier(&self) -> Decimal {
        match self {
            RiskProfile::Conservative => Decimal::new(125, 3), // 0.125
            RiskProfile::Balanced => Decimal::new(25, 2),      // 0.25
            RiskProfile::Aggressive => Decimal::new(5, 1),     // 0.5
        }
    }

    /// All known profiles (useful for iteration).
    pub const ALL: &'static [RiskProfile] = &[
        RiskProfile::Conservative,
        RiskProfile::Balanced,
        RiskProfile::Aggressive,
    ];
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskProfile::Conservative => write!(f, "conservative"),
            RiskProfile::Balanced => write!(f, "balanced"),
            RiskProfile::Aggressive => write!(f, "aggressive"),
        }
    }
}

impl std::str::FromStr for RiskProfile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conservative" => Ok(RiskProfile::Conservative),
            "balanced" => Ok(RiskProfile::Balanced),
            "aggressive" => Ok(RiskProfile::Aggressive),
            _ => Err(anyhow::anyhow!("Unknown risk profile: {s}")),
        }
    }
}

/// Staking strategy applied to the Kelly fraction (or replacing it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakingStrategy {
    KellyFull,
    KellyFractional,
    FixedPercentage,
    FixedAmount,
    ConfidenceScaled,
}

impl fmt::Display for StakingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StakingStrategy::KellyFull => write!(f, "kelly_full"),
            StakingStrategy::KellyFractional => write!(f, "kelly_fractional"),
            StakingStrategy::FixedPercentage => write!(f, "fixed_percentage"),
            StakingStrategy::FixedAmount => write!(f, "fixed_amount"),
            StakingStrategy::ConfidenceScaled => write!(f, "confidence_scaled"),
        }
    }
}

/// Wager lifecycle state. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WagerStatus {
    Pending,
    SettledWon,
    SettledLost,
    Void,
}

impl WagerStatus {
    /// Whether no further transition is permitted from this state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WagerStatus::Pending)
    }
}

impl fmt::Display for WagerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WagerStatus::Pending => write!(f, "pending"),
            WagerStatus::SettledWon => write!(f, "settled_won"),
            WagerStatus::SettledLost => write!(f, "settled_lost"),
            WagerStatus::Void => write!(f, "void"),
        }
    }
}

impl std::str::FromStr for WagerStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(WagerStatus::Pending),
            "settled_won" | "won" => Ok(WagerStatus::SettledWon),
            "settled_lost" | "lost" => Ok(WagerStatus::SettledLost),
            "void" => Ok(WagerStatus::Void),
            _ => Err(anyhow::anyhow!("Unknown wager status: {s}")),
        }
    }
}

/// Settlement outcome reported by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleResult {
    Won,
    Lost,
    Void,
}

impl fmt::Display for SettleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettleResult::Won => write!(f, "won"),
            SettleResult::Lost => write!(f, "lost"),
            SettleResult::Void => write!(f, "void"),
        }
    }
}

/// Loss-limit accrual window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitWindow {
    Daily,
    Weekly,
}

impl fmt::Display for LimitWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitWindow::Daily => write!(f, "daily"),
            LimitWindow::Weekly => write!(f, "weekly"),
        }
    }
}

/// Risk classification of a recommendation. Ordering is by severity, so
/// `max()` across band signals picks the most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// A bankroll account. One per owner key, created once, never deleted.
///
/// `current_balance` is realized balance: it changes only on settlement.
/// Pending exposure is derived from the account's pending wagers, never
/// stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Opaque owner key supplied by the identity/session provider.
    pub id: String,
    pub currency: String,
    /// Immutable after creation; the baseline for the audit invariant.
    pub initial_balance: Decimal,
    pub current_balance: Decimal,
    pub risk_profile: RiskProfile,
    pub staking_strategy: StakingStrategy,
    /// Hard per-wager cap as a fraction of current balance, 0 < f ≤ 0.25.
    pub max_stake_fraction: Decimal,
    /// `None` = unlimited.
    pub daily_loss_limit: Option<Decimal>,
    pub weekly_loss_limit: Option<Decimal>,
    pub daily_loss_accrued: Decimal,
    pub weekly_loss_accrued: Decimal,
    /// Start of the current daily accrual window (UTC midnight).
    pub day_anchor: DateTime<Utc>,
    /// Start of the current weekly accrual window (Monday 00:00 UTC).
    pub week_anchor: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// The hard stake cap at the current balance. Never negative, even if
    /// settlements have driven the balance below zero.
    pub fn max_stake(&self) -> Decimal {
        (self.max_stake_fraction * self.current_balance).max(Decimal::ZERO)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} {}/{}] balance={} (initial {})",
            self.id,
            self.currency,
            self.risk_profile,
            self.staking_strategy,
            self.current_balance,
            self.initial_balance,
        )
    }
}

/// Parameters for `CreateAccount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountParams {
    pub id: String,
    pub currency: String,
    pub initial_balance: Decimal,
    pub risk_profile: RiskProfile,
    pub staking_strategy: StakingStrategy,
    pub max_stake_fraction: Decimal,
    #[serde(default)]
    pub daily_loss_limit: Option<Decimal>,
    #[serde(default)]
    pub weekly_loss_limit: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Wager
// ---------------------------------------------------------------------------

/// A single wager. Owned by exactly one account; immutable once terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wager {
    pub id: Uuid,
    pub account_id: String,
    pub outcome_label: String,
    /// Decimal odds locked in at placement, always > 1.
    pub odds_at_placement: Decimal,
    pub stake_amount: Decimal,
    /// What the calculator recommended, kept for audit/comparison.
    pub recommended_stake_amount: Decimal,
    pub status: WagerStatus,
    pub opened_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
    /// `stake*(odds-1)` if won, `-stake` if lost, `0` if void.
    /// `None` until terminal.
    pub profit_loss: Option<Decimal>,
}

impl Wager {
    pub fn is_pending(&self) -> bool {
        self.status == WagerStatus::Pending
    }

    /// Profit if this wager wins.
    pub fn potential_profit(&self) -> Decimal {
        self.stake_amount * (self.odds_at_placement - Decimal::ONE)
    }
}

impl fmt::Display for Wager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} stake={} @ {}",
            self.id, self.status, self.outcome_label, self.stake_amount, self.odds_at_placement,
        )
    }
}

// ---------------------------------------------------------------------------
// Stake recommendation
// ---------------------------------------------------------------------------

/// Advisory note attached to an otherwise-successful recommendation.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// The edge is zero or negative; the Kelly fraction was clamped to 0.
    NegativeEdge,
    /// The cap reduced the computed amount.
    StakeCapped { original: Decimal, capped: Decimal },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::NegativeEdge => {
                write!(f, "negative or zero edge: stake fraction clamped to 0")
            }
            Warning::StakeCapped { original, capped } => {
                write!(f, "stake capped: {original} reduced to {capped}")
            }
        }
    }
}

/// Output of the Stake Calculator. Ephemeral; callers may persist it for
/// audit but the engine attaches no lifecycle to it.
#[derive(Debug, Clone)]
pub struct StakeRecommendation {
    pub probability: Decimal,
    pub odds: Decimal,
    pub strategy: StakingStrategy,
    /// Strategy fraction before the cap.
    pub computed_fraction: Decimal,
    /// `computed_fraction × balance` (or the fixed amount).
    pub computed_amount: Decimal,
    /// Final recommended amount after the cap.
    pub capped_amount: Decimal,
    pub risk_level: RiskLevel,
    /// Ordered; rendered as strings at the API boundary.
    pub warnings: Vec<Warning>,
}

impl StakeRecommendation {
    pub fn was_capped(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, Warning::StakeCapped { .. }))
    }

    pub fn has_negative_edge(&self) -> bool {
        self.warnings.contains(&Warning::NegativeEdge)
    }
}

// ---------------------------------------------------------------------------
// Status summary
// ---------------------------------------------------------------------------

/// Read-only aggregate view of an account, derived by the Ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountStatus {
    pub account_id: String,
    pub currency: String,
    pub current_balance: Decimal,
    /// Σ stake over wagers currently pending.
    pub pending_exposure: Decimal,
    /// Σ profit_loss over terminal won/lost wagers.
    pub total_profit_loss: Decimal,
    /// `total_profit_loss / initial_balance × 100`.
    pub roi_percent: Decimal,
    /// `None` when no wager has settled won or lost yet.
    pub win_rate: Option<Decimal>,
    pub total_wagers: u64,
    pub is_daily_limit_reached: bool,
    pub is_weekly_limit_reached: bool,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | balance={} exposure={} pnl={} roi={}% wagers={}",
            self.account_id,
            self.current_balance,
            self.pending_exposure,
            self.total_profit_loss,
            self.roi_percent,
            self.total_wagers,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain errors for the engine. Every rejected operation guarantees zero
/// state mutation; none of these are retried automatically.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Initial balance must be positive, got {0}")]
    InvalidInitialBalance(Decimal),

    #[error("Probability must be strictly between 0 and 1, got {0}")]
    InvalidProbability(Decimal),

    #[error("Decimal odds must be greater than 1, got {0}")]
    InvalidOdds(Decimal),

    #[error("Stake amount must be positive, got {0}")]
    InvalidStakeAmount(Decimal),

    #[error("Max stake fraction must be within (0, 0.25], got {0}")]
    InvalidMaxStakeFraction(Decimal),

    #[error("Stake {requested} exceeds cap {cap}")]
    StakeExceedsCap { requested: Decimal, cap: Decimal },

    #[error("{window} loss limit reached, resets in {}s", .resets_in.num_seconds())]
    LimitReached {
        window: LimitWindow,
        resets_in: chrono::Duration,
    },

    #[error("Wager {wager} is already {status}; no further transition permitted")]
    InvalidStateTransition { wager: Uuid, status: WagerStatus },

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Wager not found: {0}")]
    WagerNotFound(Uuid),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),
}

impl LedgerError {
    /// Stable machine-readable kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidInitialBalance(_) => "invalid_initial_balance",
            LedgerError::InvalidProbability(_) => "invalid_probability",
            LedgerError::InvalidOdds(_) => "invalid_odds",
            LedgerError::InvalidStakeAmount(_) => "invalid_stake_amount",
            LedgerError::InvalidMaxStakeFraction(_) => "invalid_max_stake_fraction",
            LedgerError::StakeExceedsCap { .. } => "stake_exceeds_cap",
            LedgerError::LimitReached {
                window: LimitWindow::Daily,
                ..
            } => "limit_reached_daily",
            LedgerError::LimitReached {
                window: LimitWindow::Weekly,
                ..
            } => "limit_reached_weekly",
            LedgerError::InvalidStateTransition { .. } => "invalid_state_transition",
            LedgerError::AccountNotFound(_) => "account_not_found",
            LedgerError::WagerNotFound(_) => "wager_not_found",
            LedgerError::AccountAlreadyExists(_) => "account_already_exists",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
