// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Integration tests for the REST API server with concurrent requests.
//!
//! These tests verify that the server maps ledger results and errors onto
//! HTTP correctly and keeps balances consistent under concurrent requests.

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
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

// === DTOs (duplicated from the demo for test isolation) ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountRequest {
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

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

async fn get_balance(State(state): State<AppState>, Path(id): Path<u64>) -> Json<Balance> {
    Json(state.ledger.balance(UserId(id)))
}

async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Json<Vec<TransactionRecord>> {
    Json(state.ledger.history(UserId(id)))
}

async fn mutate(
    State(state): State<AppState>,
    Path((id, kind)): Path<(u64, String)>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<Balance>, AppError> {
    let kind: TransactionKind = kind.parse()?;
    let ledger = state.ledger.clone();
    let balance =
        tokio::task::spawn_blocking(move || ledger.mutate(UserId(id), request.amount, kind))
            .await??;
    Ok(Json(balance))
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/point/{id}", get(get_balance))
        .route("/point/{id}/histories", get(get_history))
        .route("/point/{id}/{kind}", patch(mutate))
        .with_state(state)
}

// === Test Harness ===

/// Starts a server on an ephemeral port; returns its base URL and ledger.
async fn spawn_server() -> (String, Arc<Ledger>) {
    let ledger = Arc::new(Ledger::new());
    let app = create_router(AppState {
        ledger: ledger.clone(),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), ledger)
}

async fn send(
    client: &Client,
    base: &str,
    id: u64,
    kind: &str,
    amount: i64,
) -> reqwest::Response {
    client
        .patch(format!("{base}/point/{id}/{kind}"))
        .json(&AmountRequest { amount })
        .send()
        .await
        .unwrap()
}

// === Tests ===

#[tokio::test]
async fn balance_of_unknown_user_is_zero() {
    let (base, _) = spawn_server().await;
    let balance: Balance = reqwest::get(format!("{base}/point/1"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(balance, Balance::empty(UserId(1)));
}

#[tokio::test]
async fn charge_and_use_round_trip() {
    let (base, _) = spawn_server().await;
    let client = Client::new();

    let response = send(&client, &base, 1, "charge", 1000).await;
    assert_eq!(response.status(), StatusCode::OK);
    let balance: Balance = response.json().await.unwrap();
    assert_eq!(balance.amount, 1000);

    let response = send(&client, &base, 1, "use", 500).await;
    assert_eq!(response.status(), StatusCode::OK);
    let balance: Balance = response.json().await.unwrap();
    assert_eq!(balance.amount, 500);

    let history: Vec<TransactionRecord> = client
        .get(format!("{base}/point/1/histories"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].kind, TransactionKind::Charge);
    assert_eq!(history[0].amount, 1000);
    assert_eq!(history[1].kind, TransactionKind::Use);
    assert_eq!(history[1].amount, 500);
}

#[tokio::test]
async fn insufficient_balance_maps_to_unprocessable() {
    let (base, ledger) = spawn_server().await;
    let client = Client::new();

    let response = send(&client, &base, 1, "use", 2000).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.code, "INSUFFICIENT_BALANCE");

    assert_eq!(ledger.balance(UserId(1)).amount, 0);
    assert!(ledger.history(UserId(1)).is_empty());
}

#[tokio::test]
async fn invalid_amount_maps_to_bad_request() {
    let (base, _) = spawn_server().await;
    let client = Client::new();

    for amount in [0, -5] {
        let response = send(&client, &base, 1, "charge", amount).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.code, "INVALID_AMOUNT");
    }
}

#[tokio::test]
async fn unknown_kind_maps_to_bad_request() {
    let (base, _) = spawn_server().await;
    let client = Client::new();

    let response = send(&client, &base, 1, "refund", 10).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.code, "INVALID_TRANSACTION_KIND");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_charges_over_http() {
    let (base, ledger) = spawn_server().await;
    let client = Client::new();

    const REQUESTS: usize = 200;
    const AMOUNT: i64 = 100;

    let requests = (0..REQUESTS).map(|_| {
        let client = client.clone();
        let base = base.clone();
        async move { send(&client, &base, 1, "charge", AMOUNT).await.status() }
    });
    let statuses = futures::future::join_all(requests).await;

    assert!(statuses.iter().all(|status| *status == StatusCode::OK));
    assert_eq!(
        ledger.balance(UserId(1)).amount,
        REQUESTS as u64 * AMOUNT as u64
    );
    assert_eq!(ledger.history(UserId(1)).len(), REQUESTS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_users_over_http() {
    let (base, ledger) = spawn_server().await;
    let client = Client::new();

    const USERS: u64 = 20;
    const PER_USER: u64 = 10;

    let requests = (0..USERS * PER_USER).map(|i| {
        let client = client.clone();
        let base = base.clone();
        async move {
            let user = i % USERS + 1;
            send(&client, &base, user, "charge", user as i64).await.status()
        }
    });
    let statuses = futures::future::join_all(requests).await;
    assert!(statuses.iter().all(|status| *status == StatusCode::OK));

    for user in 1..=USERS {
        assert_eq!(ledger.balance(UserId(user)).amount, user * PER_USER);
        assert_eq!(ledger.history(UserId(user)).len(), PER_USER as usize);
    }
}

/// A mutation waiting on a held user lock must not stall the runtime; on a
/// single-threaded runtime other requests still get answered.
#[tokio::test]
async fn blocked_mutation_does_not_stall_other_requests() {
    let (base, ledger) = spawn_server().await;
    let client = Client::new();

    let guard = ledger.lock_registry().acquire(UserId(1));

    let pending = {
        let client = client.clone();
        let base = base.clone();
        tokio::spawn(async move { send(&client, &base, 1, "charge", 10).await.status() })
    };
    // Let the charge reach the held lock.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let response = tokio::time::timeout(
        Duration::from_secs(2),
        client.get(format!("{base}/point/2")).send(),
    )
    .await
    .expect("server stalled behind a blocked mutation")
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!pending.is_finished());

    guard.release();
    assert_eq!(pending.await.unwrap(), StatusCode::OK);
    assert_eq!(ledger.balance(UserId(1)).amount, 10);
}
