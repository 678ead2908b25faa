//! Simple REST API server example for the point ledger.
//!
//! Run with: `cargo run --example server`
//!
//! ## Endpoints
//!
//! - `GET /point/{id}` - Get a user's balance
//! - `GET /point/{id}/histories` - Get a user's transaction history
//! - `PATCH /point/{id}/charge` - Charge points
//! - `PATCH /point/{id}/use` - Use points
//!
//! ## Example Usage
//!
//! ```bash
//! # Charge
//! curl -X PATCH http://localhost:3000/point/1/charge \
//!   -H "Content-Type: application/json" \
//!   -d '{"amount": 1000}'
//!
//! # Use
//! curl -X PATCH http://localhost:3000/point/1/use \
//!   -H "Content-Type: application/json" \
//!   -d '{"amount": 500}'
//!
//! # Balance and history
//! curl http://localhost:3000/point/1
//! curl http://localhost:3000/point/1/histories
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use point_ledger::{
    Balance, ErrorCategory, Ledger, PointError, TransactionKind, TransactionRecord, UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

// === Request/Response DTOs ===

/// Request body for charge and use:
/// ```json
/// {"amount": 1000}
/// ```
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: i64,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state containing the ledger.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

// === Error Handling ===

/// Converts `PointError` and task failures into HTTP responses.
pub enum AppError {
    Point(PointError),
    /// The blocking mutation task panicked or was cancelled.
    Internal,
}

impl From<PointError> for AppError {
    fn from(err: PointError) -> Self {
        AppError::Point(err)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(_: tokio::task::JoinError) -> Self {
        AppError::Internal
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = match self {
            AppError::Point(err) => err,
            AppError::Internal => {
                let body = ErrorResponse {
                    error: "internal error".to_string(),
                    code: "INTERNAL".to_string(),
                };
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
        };

        let status = match err.category() {
            ErrorCategory::Validation => StatusCode::BAD_REQUEST,
            ErrorCategory::Domain => StatusCode::UNPROCESSABLE_ENTITY,
        };
        let code = match &err {
            PointError::InvalidAmount => "INVALID_AMOUNT",
            PointError::InvalidTransactionKind => "INVALID_TRANSACTION_KIND",
            PointError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            PointError::BalanceOverflow => "BALANCE_OVERFLOW",
        };

        (
            status,
            Json(ErrorResponse {
                error: err.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// GET /point/{id} - Get a user's balance.
async fn get_balance(State(state): State<AppState>, Path(id): Path<u64>) -> Json<Balance> {
    Json(state.ledger.balance(UserId(id)))
}

/// GET /point/{id}/histories - Get a user's history.
async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Json<Vec<TransactionRecord>> {
    Json(state.ledger.history(UserId(id)))
}

/// PATCH /point/{id}/{kind} - Charge or use points.
async fn mutate(
    State(state): State<AppState>,
    Path((id, kind)): Path<(u64, String)>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<Balance>, AppError> {
    let kind: TransactionKind = kind.parse()?;
    // The user lock is a blocking mutex; wait for it off the async workers.
    let ledger = state.ledger.clone();
    let balance =
        tokio::task::spawn_blocking(move || ledger.mutate(UserId(id), request.amount, kind))
            .await??;
    Ok(Json(balance))
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/point/{id}", get(get_balance))
        .route("/point/{id}/histories", get(get_history))
        .route("/point/{id}/{kind}", patch(mutate))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let state = AppState {
        ledger: Arc::new(Ledger::new()),
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("Point ledger API server running on http://127.0.0.1:3000");

    axum::serve(listener, app).await?;
    Ok(())
}
