//! Risk Limit Guard — rolling loss windows and placement gating.
//!
//! Loss accrual windows are evaluated lazily, at decision time: there is no
//! background timer. The daily window is anchored at UTC midnight, the
//! weekly window at Monday 00:00 UTC. `roll_windows` commits any crossed
//! boundary (reset accrual, advance anchor); `check` then reports a breach
//! when an accrued loss meets a configured limit. A breach only blocks new
//! placements; it never forces settlement or touches balances.
//!
//! All functions take the current time as a parameter, so the ledger passes
//! `Utc::now()` and tests pass fixed instants.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::types::{Account, LedgerError, LimitWindow};

/// UTC midnight of the day containing `t`.
pub fn day_start(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Monday 00:00 UTC of the week containing `t`.
pub fn week_start(t: DateTime<Utc>) -> DateTime<Utc> {
    let days_into_week = t.weekday().num_days_from_monday() as i64;
    day_start(t) - Duration::days(days_into_week)
}

/// Advance any crossed window: zero the accrued loss and move the anchor to
/// the start of the window containing `now`. Idempotent within a window.
pub fn roll_windows(account: &mut Account, now: DateTime<Utc>) {
    if now >= account.day_anchor + Duration::days(1) {
        debug!(
            account_id = %account.id,
            dropped = %account.daily_loss_accrued,
            "Daily loss window rolled"
        );
        account.daily_loss_accrued = Decimal::ZERO;
        account.day_anchor = day_start(now);
    }
    if now >= account.week_anchor + Duration::days(7) {
        debug!(
            account_id = %account.id,
            dropped = %account.weekly_loss_accrued,
            "Weekly loss window rolled"
        );
        account.weekly_loss_accrued = Decimal::ZERO;
        account.week_anchor = week_start(now);
    }
}

/// Report whether a configured loss limit blocks new placements.
/// Call after `roll_windows`; anchors are assumed current.
pub fn check(account: &Account, now: DateTime<Utc>) -> Result<(), LedgerError> {
    if let Some(limit) = account.daily_loss_limit {
        if account.daily_loss_accrued >= limit {
            return Err(LedgerError::LimitReached {
                window: LimitWindow::Daily,
                resets_in: account.day_anchor + Duration::days(1) - now,
            });
        }
    }
    if let Some(limit) = account.weekly_loss_limit {
        if account.weekly_loss_accrued >= limit {
            return Err(LedgerError::LimitReached {
                window: LimitWindow::Weekly,
                resets_in: account.week_anchor + Duration::days(7) - now,
            });
        }
    }
    Ok(())
}

/// Record a realized loss into both accrual windows.
pub fn accrue_loss(account: &mut Account, stake: Decimal) {
    account.daily_loss_accrued += stake;
    account.weekly_loss_accrued += stake;
}

/// Accrued daily loss as of `now`, without committing a roll. Used by the
/// read-only status facade.
pub fn effective_daily_accrued(account: &Account, now: DateTime<Utc>) -> Decimal {
    if now >= account.day_anchor + Duration::days(1) {
        Decimal::ZERO
    } else {
        account.daily_loss_accrued
    }
}

/// Weekly counterpart of `effective_daily_accrued`.
pub fn effective_weekly_accrued(account: &Account, now: DateTime<Utc>) -> Decimal {
    if now >= account.week_anchor + Duration::days(7) {
        Decimal::ZERO
    } else {
        account.weekly_loss_accrued
    }
}

/// Whether the daily limit currently blocks placement, without mutation.
pub fn is_daily_limit_reached(account: &Account, now: DateTime<Utc>) -> bool {
    match account.daily_loss_limit {
        Some(limit) => effective_daily_accrued(account, now) >= limit,
        None => false,
    }
}

/// Whether the weekly limit currently blocks placement, without mutation.
pub fn is_weekly_limit_reached(account: &Account, now: DateTime<Utc>) -> bool {
    match account.weekly_loss_limit {
        Some(limit) => effective_weekly_accrued(account, now) >= limit,
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
