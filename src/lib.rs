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

//! # Point Ledger
//!
//! This library provides a point ledger that charges and uses points per user,
//! keeps the running balance and an append-only transaction history, and
//! serializes concurrent mutations for the same user.
//!
//! ## Core Components
//!
//! - [`Ledger`]: Validates and applies mutations under a per-user lock
//! - [`LockRegistry`]: Lazily created, reclaimable per-user locks
//! - [`BalanceStore`] / [`HistoryStore`]: Storage seams, with in-memory
//!   [`BalanceTable`] and [`HistoryTable`] implementations
//! - [`PointError`]: Error types for mutation failures
//!
//! ## Example
//!
//! ```
//! use point_ledger::{Ledger, PointError, TransactionKind, UserId};
//!
//! let ledger = Ledger::new();
//!
//! let balance = ledger.mutate(UserId(1), 1000, TransactionKind::Charge).unwrap();
//! assert_eq!(balance.amount, 1000);
//!
//! ledger.use_points(UserId(1), 500).unwrap();
//! assert_eq!(ledger.balance(UserId(1)).amount, 500);
//!
//! let err = ledger.use_points(UserId(1), 2000).unwrap_err();
//! assert!(matches!(err, PointError::InsufficientBalance { .. }));
//! assert_eq!(ledger.history(UserId(1)).len(), 2);
//! ```
//!
//! ## Thread Safety
//!
//! The ledger is `Sync`. Share it behind an `Arc` and mutate from any number of
//! threads: mutations for one user are serialized, mutations for different
//! users run in parallel.

mod balance;
mod base;
pub mod config;
mod engine;
pub mod error;
pub mod lock_registry;
pub mod store;
mod transaction;

pub use balance::Balance;
pub use base::UserId;
pub use config::{LedgerConfig, ReclaimPolicy};
pub use engine::Ledger;
pub use error::{ErrorCategory, PointError};
pub use lock_registry::{LockGuard, LockRegistry};
pub use store::{BalanceStore, BalanceTable, HistoryStore, HistoryTable};
pub use transaction::{TransactionKind, TransactionRecord};
