//! API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ServiceState>`.
//! Domain errors map onto HTTP statuses; the body always carries the
//! machine-readable error kind next to the human-readable message.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::ledger::Ledger;
use crate::stake::StakeCalculator;
use crate::storage;
use crate::types::{
    Account, AccountParams, AccountStatus, LedgerError, SettleResult, StakeRecommendation, Wager,
};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ServiceState {
    pub ledger: Ledger,
    pub calculator: StakeCalculator,
    /// Snapshot persistence after mutating calls. Off in tests.
    persist: bool,
    state_file: Option<String>,
}

impl ServiceState {
    /// State without persistence (tests, embedded use).
    pub fn new(ledger: Ledger, calculator: StakeCalculator) -> Self {
        Self {
            ledger,
            calculator,
            persist: false,
            state_file: None,
        }
    }

    /// State that writes a snapshot after every mutating call.
    pub fn with_persistence(
        ledger: Ledger,
        calculator: StakeCalculator,
        state_file: Option<String>,
    ) -> Self {
        Self {
            ledger,
            calculator,
            persist: true,
            state_file,
        }
    }

    /// Save a snapshot if persistence is on. Failures are logged, never
    /// surfaced: the in-memory ledger remains the source of truth.
    pub async fn persist(&self) {
        if !self.persist {
            return;
        }
        let snapshot = self.ledger.snapshot().await;
        if let Err(e) = storage::save_snapshot(&snapshot, self.state_file.as_deref()) {
            error!(error = %e, "Failed to persist ledger snapshot");
        }
    }
}

pub type AppState = Arc<ServiceState>;

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

pub enum ApiError {
    Domain(LedgerError),
    BadRequest(String),
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError::Domain(e)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::Domain(e) => {
                let status = match &e {
                    LedgerError::AccountNotFound(_) | LedgerError::WagerNotFound(_) => {
                        StatusCode::NOT_FOUND
                    }
                    LedgerError::InvalidStateTransition { .. }
                    | LedgerError::LimitReached { .. }
                    | LedgerError::AccountAlreadyExists(_) => StatusCode::CONFLICT,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, e.kind().to_string(), e.to_string())
            }
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, "bad_request".to_string(), message)
            }
        };
        (
            status,
            Json(ErrorBody {
                error: kind,
                message,
            }),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CreateAccountResponse {
    pub account_id: String,
    pub status: AccountStatus,
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub probability: Decimal,
    pub odds: Decimal,
    #[serde(default)]
    pub confidence: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub probability: Decimal,
    pub odds: Decimal,
    pub strategy: String,
    pub computed_fraction: Decimal,
    pub computed_amount: Decimal,
    pub capped_amount: Decimal,
    pub risk_level: String,
    pub warnings: Vec<String>,
}

impl From<StakeRecommendation> for RecommendationResponse {
    fn from(rec: StakeRecommendation) -> Self {
        Self {
            probability: rec.probability,
            odds: rec.odds,
            strategy: rec.strategy.to_string(),
            computed_fraction: rec.computed_fraction,
            computed_amount: rec.computed_amount,
            capped_amount: rec.capped_amount,
            risk_level: rec.risk_level.to_string(),
            warnings: rec.warnings.iter().map(|w| w.to_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PlaceWagerRequest {
    pub outcome_label: String,
    pub odds: Decimal,
    pub stake_amount: Decimal,
    pub recommended_stake_amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub result: SettleResult,
}

#[derive(Debug, Deserialize)]
pub struct ListWagersQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// POST /api/accounts
pub async fn create_account(
    State(state): State<AppState>,
    Json(params): Json<AccountParams>,
) -> Result<(StatusCode, Json<CreateAccountResponse>), ApiError> {
    let account: Account = state.ledger.create_account(params).await?;
    let status = state.ledger.status(&account.id).await?;
    state.persist().await;
    Ok((
        StatusCode::CREATED,
        Json(CreateAccountResponse {
            account_id: account.id,
            status,
        }),
    ))
}

/// POST /api/accounts/:id/recommend
pub async fn recommend_stake(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Json(req): Json<RecommendRequest>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let account = state.ledger.account(&account_id).await?;
    let rec = state
        .calculator
        .recommend(&account, req.probability, req.odds, req.confidence)?;
    Ok(Json(rec.into()))
}

/// POST /api/accounts/:id/wagers
pub async fn place_wager(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Json(req): Json<PlaceWagerRequest>,
) -> Result<(StatusCode, Json<Wager>), ApiError> {
    let wager = state
        .ledger
        .place_wager(
            &account_id,
            &req.outcome_label,
            req.odds,
            req.stake_amount,
            req.recommended_stake_amount,
        )
        .await?;
    state.persist().await;
    Ok((StatusCode::CREATED, Json(wager)))
}

/// POST /api/wagers/:id/settle
pub async fn settle_wager(
    State(state): State<AppState>,
    Path(wager_id): Path<Uuid>,
    Json(req): Json<SettleRequest>,
) -> Result<Json<Wager>, ApiError> {
    let wager = state.ledger.settle_wager(wager_id, req.result).await?;
    state.persist().await;
    Ok(Json(wager))
}

/// GET /api/accounts/:id/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<AccountStatus>, ApiError> {
    Ok(Json(state.ledger.status(&account_id).await?))
}

/// GET /api/accounts/:id/wagers?status=pending&limit=50
pub async fn list_wagers(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Query(query): Query<ListWagersQuery>,
) -> Result<Json<Vec<Wager>>, ApiError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(
            s.parse()
                .map_err(|_| ApiError::BadRequest(format!("Unknown wager status: {s}")))?,
        ),
        None => None,
    };
    let wagers = state
        .ledger
        .list_wagers(&account_id, status, query.limit)
        .await?;
    Ok(Json(wagers))
}

/// GET /api/accounts
pub async fn list_accounts(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.ledger.list_accounts().await)
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LimitWindow, RiskLevel, StakingStrategy, Warning, WagerStatus};
    use rust_decimal_macros::dec;

    fn status_of(e: LedgerError) -> StatusCode {
        ApiError::Domain(e).into_response().status()
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            status_of(LedgerError::AccountNotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(LedgerError::WagerNotFound(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(LedgerError::InvalidStateTransition {
                wager: Uuid::new_v4(),
                status: WagerStatus::Void,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(LedgerError::LimitReached {
                window: LimitWindow::Daily,
                resets_in: chrono::Duration::hours(1),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(LedgerError::InvalidOdds(dec!(1))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(LedgerError::StakeExceedsCap {
                requested: dec!(10),
                cap: dec!(5),
            }),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_bad_request_response() {
        let resp = ApiError::BadRequest("Unknown wager status: limbo".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_recommendation_response_renders_warnings() {
        let rec = crate::types::StakeRecommendation {
            probability: dec!(0.3),
            odds: dec!(2.0),
            strategy: StakingStrategy::FixedPercentage,
            computed_fraction: dec!(0.02),
            computed_amount: dec!(20),
            capped_amount: dec!(20),
            risk_level: RiskLevel::High,
            warnings: vec![Warning::NegativeEdge],
        };
        let resp: RecommendationResponse = rec.into();
        assert_eq!(resp.strategy, "fixed_percentage");
        assert_eq!(resp.risk_level, "high");
        assert_eq!(resp.warnings.len(), 1);
        assert!(resp.warnings[0].contains("clamped to 0"));
    }
}
