//! Simple REST API server example for the creator revenue ledger.
//!
//! Run with: `cargo run --example server`
//!
//! ## Endpoints
//!
//! - `POST /revenue` - Record a revenue accrual (trusted internal trigger)
//! - `POST /payouts` - Request a payout
//! - `POST /payouts/{id}/process` - Mark a payout as processing
//! - `POST /payouts/{id}/complete` - Mark a payout as completed
//! - `POST /payouts/{id}/fail` - Mark a payout as failed
//! - `GET /payouts/pending` - Pending payout queue (FIFO)
//! - `GET /creators/{id}/earnings` - Earnings summary
//! - `GET /creators/{id}/breakdown` - Revenue breakdown, newest first
//! - `GET /creators/{id}/payouts` - Payout history
//! - `GET /creators/{id}/stats` - Trailing-window revenue stats
//!
//! ## Example Usage
//!
//! ```bash
//! # Accrue campaign-success revenue
//! curl -X POST http://localhost:3000/revenue \
//!   -H "Content-Type: application/json" \
//!   -d '{"creator_id": 1, "campaign_id": 7, "amount": "25.00", "source": "campaign_success"}'
//!
//! # Request a payout
//! curl -X POST http://localhost:3000/payouts \
//!   -H "Content-Type: application/json" \
//!   -d '{"creator_id": 1, "amount": "25.00", "bank_details": "iban:XX00"}'
//!
//! # Earnings summary
//! curl http://localhost:3000/creators/1/earnings
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use creator_ledger_rs::{
    CampaignId, CreatorId, EarningsSummary, Ledger, LedgerError, PayoutId, PayoutRequest,
    RevenueEntry, RevenueStats, RevenueSource,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

// === Request/Response DTOs ===

/// Request body for recording an accrual.
#[derive(Debug, Deserialize)]
pub struct RevenueRequest {
    pub creator_id: u32,
    pub campaign_id: u32,
    pub amount: Decimal,
    /// Source tag: referral_bonus, campaign_success, or tip_jar.
    pub source: String,
}

/// Request body for requesting a payout.
#[derive(Debug, Deserialize)]
pub struct PayoutCreateRequest {
    pub creator_id: u32,
    pub amount: Decimal,
    pub bank_details: String,
}

/// Request body for failing a payout.
#[derive(Debug, Deserialize)]
pub struct PayoutFailRequest {
    pub reason: String,
}

/// Response body for a created payout.
#[derive(Debug, Serialize)]
pub struct PayoutCreatedResponse {
    pub payout_id: u64,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state containing the ledger engine.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

// === Error Handling ===

/// Wrapper for converting `LedgerError` into HTTP responses.
///
/// Validation errors map to 400, missing entities to 404, and state-machine
/// violations to 409 (an ordering bug in the calling collaborator; never
/// silently retried).
pub struct AppError(LedgerError);

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            LedgerError::InvalidAmount => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
            LedgerError::InvalidSource => (StatusCode::BAD_REQUEST, "INVALID_SOURCE"),
            LedgerError::BelowMinimumThreshold => {
                (StatusCode::BAD_REQUEST, "BELOW_MINIMUM_THRESHOLD")
            }
            LedgerError::InsufficientAvailableBalance => {
                (StatusCode::BAD_REQUEST, "INSUFFICIENT_AVAILABLE_BALANCE")
            }
            LedgerError::AccountNotFound => (StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND"),
            LedgerError::PayoutNotFound => (StatusCode::NOT_FOUND, "PAYOUT_NOT_FOUND"),
            LedgerError::InvalidStateTransition { .. } => {
                (StatusCode::CONFLICT, "INVALID_STATE_TRANSITION")
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /revenue - Record a revenue accrual.
async fn add_revenue(
    State(state): State<AppState>,
    Json(request): Json<RevenueRequest>,
) -> Result<StatusCode, AppError> {
    let source: RevenueSource = request.source.parse()?;
    state.ledger.add_revenue(
        CreatorId(request.creator_id),
        request.amount,
        source,
        CampaignId(request.campaign_id),
    )?;
    Ok(StatusCode::CREATED)
}

/// POST /payouts - Request a payout.
async fn request_payout(
    State(state): State<AppState>,
    Json(request): Json<PayoutCreateRequest>,
) -> Result<(StatusCode, Json<PayoutCreatedResponse>), AppError> {
    let payout_id = state.ledger.request_payout(
        CreatorId(request.creator_id),
        request.amount,
        request.bank_details,
    )?;
    Ok((
        StatusCode::CREATED,
        Json(PayoutCreatedResponse {
            payout_id: payout_id.0,
        }),
    ))
}

/// POST /payouts/{id}/process - Processor picked the payout up.
async fn start_processing(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, AppError> {
    state.ledger.start_payout_processing(PayoutId(id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /payouts/{id}/complete - Processor confirmed the transfer.
async fn complete_payout(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, AppError> {
    state.ledger.complete_payout_request(PayoutId(id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /payouts/{id}/fail - Processor reported a failure.
async fn fail_payout(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<PayoutFailRequest>,
) -> Result<StatusCode, AppError> {
    state
        .ledger
        .fail_payout_request(PayoutId(id), &request.reason)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /payouts/pending - FIFO queue for the processor.
async fn pending_payouts(State(state): State<AppState>) -> Json<Vec<PayoutRequest>> {
    Json(state.ledger.get_pending_payout_requests())
}

/// GET /creators/{id}/earnings - Earnings summary (lazily creates the account).
async fn earnings(State(state): State<AppState>, Path(id): Path<u32>) -> Json<EarningsSummary> {
    Json(state.ledger.calculate_earnings(CreatorId(id)))
}

/// GET /creators/{id}/breakdown - Ledger entries, newest first.
async fn breakdown(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<Vec<RevenueEntry>>, AppError> {
    Ok(Json(state.ledger.get_revenue_breakdown(CreatorId(id))?))
}

/// GET /creators/{id}/payouts - Payout history, newest first.
async fn payout_history(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<Vec<PayoutRequest>>, AppError> {
    Ok(Json(state.ledger.get_payout_history(CreatorId(id))?))
}

/// GET /creators/{id}/stats - Trailing-window stats.
async fn revenue_stats(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<RevenueStats>, AppError> {
    Ok(Json(state.ledger.get_revenue_stats(CreatorId(id))?))
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/revenue", post(add_revenue))
        .route("/payouts", post(request_payout))
        .route("/payouts/pending", get(pending_payouts))
        .route("/payouts/{id}/process", post(start_processing))
        .route("/payouts/{id}/complete", post(complete_payout))
        .route("/payouts/{id}/fail", post(fail_payout))
        .route("/creators/{id}/earnings", get(earnings))
        .route("/creators/{id}/breakdown", get(breakdown))
        .route("/creators/{id}/payouts", get(payout_history))
        .route("/creators/{id}/stats", get(revenue_stats))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    let state = AppState {
        ledger: Arc::new(Ledger::new()),
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
    println!("Creator ledger API server running on http://127.0.0.1:3000");
    println!();
    println!("Endpoints:");
    println!("  POST /revenue                - Record a revenue accrual");
    println!("  POST /payouts                - Request a payout");
    println!("  GET  /payouts/pending        - Pending payout queue");
    println!("  POST /payouts/:id/process    - Start processing");
    println!("  POST /payouts/:id/complete   - Complete a payout");
    println!("  POST /payouts/:id/fail       - Fail a payout");
    println!("  GET  /creators/:id/earnings  - Earnings summary");
    println!("  GET  /creators/:id/breakdown - Revenue breakdown");
    println!("  GET  /creators/:id/payouts   - Payout history");
    println!("  GET  /creators/:id/stats     - Revenue stats");

    axum::serve(listener, app).await.unwrap();
}
