//! Bankroll Ledger — accounts, wagers, and the settlement state machine.
//!
//! The ledger owns all mutable financial state. Each account and its wager
//! rows form one unit of isolation behind a per-account `Mutex`; unrelated
//! accounts never contend. The outer registry lock is held only long enough
//! to look up the cell, so there is no global lock on the hot path.
//!
//! Every operation is all-or-nothing: validation runs before any mutation,
//! and a rejected call leaves the cell exactly as it found it.

pub mod guard;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::types::{
    Account, AccountParams, AccountStatus, LedgerError, SettleResult, Wager, WagerStatus,
};

/// Upper bound on `max_stake_fraction` (a quarter of the bankroll).
const MAX_STAKE_FRACTION_CEILING: Decimal = Decimal::from_parts(25, 0, 0, false, 2);

// ---------------------------------------------------------------------------
// Account cell
// ---------------------------------------------------------------------------

/// An account plus its wagers: the unit of isolation and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountCell {
    pub account: Account,
    pub wagers: Vec<Wager>,
}

/// Serializable view of the whole ledger, for the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub accounts: Vec<AccountCell>,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

pub struct Ledger {
    accounts: RwLock<HashMap<String, Arc<Mutex<AccountCell>>>>,
    /// Wager id → owning account id, so settlement is a single-account op.
    wager_index: RwLock<HashMap<Uuid, String>>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            wager_index: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuild a ledger from a persisted snapshot.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let mut accounts = HashMap::new();
        let mut wager_index = HashMap::new();
        for cell in snapshot.accounts {
            for wager in &cell.wagers {
                wager_index.insert(wager.id, cell.account.id.clone());
            }
            accounts.insert(cell.account.id.clone(), Arc::new(Mutex::new(cell)));
        }
        Self {
            accounts: RwLock::new(accounts),
            wager_index: RwLock::new(wager_index),
        }
    }

    /// Clone the full ledger state for persistence.
    pub async fn snapshot(&self) -> LedgerSnapshot {
        let registry = self.accounts.read().await;
        let mut cells = Vec::with_capacity(registry.len());
        for cell in registry.values() {
            cells.push(cell.lock().await.clone());
        }
        // Stable order keeps snapshots diffable
        cells.sort_by(|a, b| a.account.id.cmp(&b.account.id));
        LedgerSnapshot { accounts: cells }
    }

    /// Look up the cell for an account.
    async fn cell(&self, account_id: &str) -> Result<Arc<Mutex<AccountCell>>, LedgerError> {
        self.accounts
            .read()
            .await
            .get(account_id)
            .cloned()
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    // -- operations --------------------------------------------------------

    /// Create an account. The owner key is supplied by the identity
    /// provider; an account is created once per key and never deleted.
    pub async fn create_account(&self, params: AccountParams) -> Result<Account, LedgerError> {
        if params.initial_balance <= Decimal::ZERO {
            return Err(LedgerError::InvalidInitialBalance(params.initial_balance));
        }
        if params.max_stake_fraction <= Decimal::ZERO
            || params.max_stake_fraction > MAX_STAKE_FRACTION_CEILING
        {
            return Err(LedgerError::InvalidMaxStakeFraction(
                params.max_stake_fraction,
            ));
        }

        let now = Utc::now();
        let account = Account {
            id: params.id,
            currency: params.currency,
            initial_balance: params.initial_balance,
            current_balance: params.initial_balance,
            risk_profile: params.risk_profile,
            staking_strategy: params.staking_strategy,
            max_stake_fraction: params.max_stake_fraction,
            daily_loss_limit: params.daily_loss_limit,
            weekly_loss_limit: params.weekly_loss_limit,
            daily_loss_accrued: Decimal::ZERO,
            weekly_loss_accrued: Decimal::ZERO,
            day_anchor: guard::day_start(now),
            week_anchor: guard::week_start(now),
            created_at: now,
        };

        let mut registry = self.accounts.write().await;
        if registry.contains_key(&account.id) {
            return Err(LedgerError::AccountAlreadyExists(account.id));
        }

        info!(
            account_id = %account.id,
            balance = %account.initial_balance,
            currency = %account.currency,
            profile = %account.risk_profile,
            strategy = %account.staking_strategy,
            "Account created"
        );

        registry.insert(
            account.id.clone(),
            Arc::new(Mutex::new(AccountCell {
                account: account.clone(),
                wagers: Vec::new(),
            })),
        );
        Ok(account)
    }

    /// A copy of the account record (for the calculator and the API layer).
    pub async fn account(&self, account_id: &str) -> Result<Account, LedgerError> {
        let cell = self.cell(account_id).await?;
        let cell = cell.lock().await;
        Ok(cell.account.clone())
    }

    /// Account ids currently registered.
    pub async fn list_accounts(&self) -> Vec<String> {
        let registry = self.accounts.read().await;
        let mut ids: Vec<String> = registry.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Open a new wager in `pending` state.
    ///
    /// The Guard is consulted first (committing any lazy window roll); the
    /// stake cap is then re-validated against the live balance regardless of
    /// what the calculator told the caller.
    pub async fn place_wager(
        &self,
        account_id: &str,
        outcome_label: &str,
        odds: Decimal,
        stake_amount: Decimal,
        recommended_stake_amount: Decimal,
    ) -> Result<Wager, LedgerError> {
        if odds <= Decimal::ONE {
            return Err(LedgerError::InvalidOdds(odds));
        }
        if stake_amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidStakeAmount(stake_amount));
        }

        let cell = self.cell(account_id).await?;
        let mut cell = cell.lock().await;
        let now = Utc::now();

        guard::roll_windows(&mut cell.account, now);
        guard::check(&cell.account, now)?;

        let cap = cell.account.max_stake();
        if stake_amount > cap {
            return Err(LedgerError::StakeExceedsCap {
                requested: stake_amount,
                cap,
            });
        }

        let wager = Wager {
            id: Uuid::new_v4(),
            account_id: account_id.to_string(),
            outcome_label: outcome_label.to_string(),
            odds_at_placement: odds,
            stake_amount,
            recommended_stake_amount,
            status: WagerStatus::Pending,
            opened_at: now,
            settled_at: None,
            profit_loss: None,
        };

        info!(
            account_id = %account_id,
            wager_id = %wager.id,
            outcome = %outcome_label,
            odds = %odds,
            stake = %stake_amount,
            recommended = %recommended_stake_amount,
            "Wager placed"
        );

        cell.wagers.push(wager.clone());
        self.wager_index
            .write()
            .await
            .insert(wager.id, account_id.to_string());
        Ok(wager)
    }

    /// Settle a pending wager. The balance update, loss accrual, and state
    /// transition happen inside one account lock acquisition.
    ///
    /// Settlement is idempotent-by-rejection: a second attempt on a
    /// terminal wager fails with `InvalidStateTransition` and changes
    /// nothing, so callers can detect programming errors.
    pub async fn settle_wager(
        &self,
        wager_id: Uuid,
        result: SettleResult,
    ) -> Result<Wager, LedgerError> {
        let account_id = self
            .wager_index
            .read()
            .await
            .get(&wager_id)
            .cloned()
            .ok_or(LedgerError::WagerNotFound(wager_id))?;

        let cell = self.cell(&account_id).await?;
        let mut cell = cell.lock().await;

        let idx = cell
            .wagers
            .iter()
            .position(|w| w.id == wager_id)
            .ok_or(LedgerError::WagerNotFound(wager_id))?;

        let status = cell.wagers[idx].status;
        if status.is_terminal() {
            return Err(LedgerError::InvalidStateTransition {
                wager: wager_id,
                status,
            });
        }

        let stake = cell.wagers[idx].stake_amount;
        let odds = cell.wagers[idx].odds_at_placement;
        let now = Utc::now();

        let (new_status, profit_loss) = match result {
            SettleResult::Won => {
                let pl = stake * (odds - Decimal::ONE);
                cell.account.current_balance += pl;
                (WagerStatus::SettledWon, pl)
            }
            SettleResult::Lost => {
                cell.account.current_balance -= stake;
                // Roll first so the loss accrues into the current window
                guard::roll_windows(&mut cell.account, now);
                guard::accrue_loss(&mut cell.account, stake);
                (WagerStatus::SettledLost, -stake)
            }
            SettleResult::Void => (WagerStatus::Void, Decimal::ZERO),
        };

        let wager = &mut cell.wagers[idx];
        wager.status = new_status;
        wager.settled_at = Some(now);
        wager.profit_loss = Some(profit_loss);
        let settled = wager.clone();

        info!(
            account_id = %account_id,
            wager_id = %wager_id,
            result = %result,
            profit_loss = %profit_loss,
            balance = %cell.account.current_balance,
            "Wager settled"
        );

        Ok(settled)
    }

    /// Read-only aggregate view. Derives pending exposure and totals by
    /// summation so they can never drift from the wager rows.
    pub async fn status(&self, account_id: &str) -> Result<AccountStatus, LedgerError> {
        let cell = self.cell(account_id).await?;
        let cell = cell.lock().await;
        let account = &cell.account;
        let now = Utc::now();

        let pending_exposure: Decimal = cell
            .wagers
            .iter()
            .filter(|w| w.is_pending())
            .map(|w| w.stake_amount)
            .sum();

        let total_profit_loss: Decimal = cell
            .wagers
            .iter()
            .filter(|w| {
                matches!(w.status, WagerStatus::SettledWon | WagerStatus::SettledLost)
            })
            .filter_map(|w| w.profit_loss)
            .sum();

        let wins = cell
            .wagers
            .iter()
            .filter(|w| w.status == WagerStatus::SettledWon)
            .count() as u64;
        let losses = cell
            .wagers
            .iter()
            .filter(|w| w.status == WagerStatus::SettledLost)
            .count() as u64;
        let win_rate = if wins + losses == 0 {
            None
        } else {
            Some(Decimal::from(wins) / Decimal::from(wins + losses) * Decimal::ONE_HUNDRED)
        };

        let roi_percent =
            total_profit_loss / account.initial_balance * Decimal::ONE_HUNDRED;

        Ok(AccountStatus {
            account_id: account.id.clone(),
            currency: account.currency.clone(),
            current_balance: account.current_balance,
            pending_exposure,
            total_profit_loss,
            roi_percent,
            win_rate,
            total_wagers: cell.wagers.len() as u64,
            is_daily_limit_reached: guard::is_daily_limit_reached(account, now),
            is_weekly_limit_reached: guard::is_weekly_limit_reached(account, now),
        })
    }

    /// Wagers for an account, most recent first, optionally filtered by
    /// status and truncated to `limit`.
    pub async fn list_wagers(
        &self,
        account_id: &str,
        status: Option<WagerStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<Wager>, LedgerError> {
        let cell = self.cell(account_id).await?;
        let cell = cell.lock().await;
        let filtered = cell
            .wagers
            .iter()
            .rev()
            .filter(|w| status.map_or(true, |s| w.status == s))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(filtered)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
