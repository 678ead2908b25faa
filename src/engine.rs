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

//! Point mutation engine.
//!
//! The [`Ledger`] is the central component: it validates mutation requests,
//! serializes them per user through the [`LockRegistry`], and keeps the
//! balance and history stores in step.
//!
//! # Mutations
//!
//! - **Charge**: adds points, creating the balance if needed.
//! - **Use**: removes points; fails if the balance is too low.
//!
//! # Thread Safety
//!
//! Mutations for one user run one at a time. Mutations for different users
//! never share a lock and proceed in parallel. Reads do not take the user
//! lock and see the last committed balance.

use crate::base::{UserId, now_millis};
use crate::store::{BalanceStore, BalanceTable, HistoryStore, HistoryTable};
use crate::{
    Balance, LedgerConfig, LockRegistry, PointError, ReclaimPolicy, TransactionKind,
    TransactionRecord,
};
use tracing::{debug, trace};

/// Point ledger over a balance store and a history store.
///
/// # Invariants
///
/// - A balance never goes below zero.
/// - Every successful mutation writes exactly one history record; a failed
///   mutation writes nothing.
/// - The balance write and the history append for one mutation happen under
///   the same user lock.
pub struct Ledger<B = BalanceTable, H = HistoryTable> {
    balances: B,
    history: H,
    locks: LockRegistry,
}

impl Ledger {
    /// Creates a ledger with empty in-memory stores and default settings.
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    /// Creates a ledger with empty in-memory stores.
    pub fn with_config(config: LedgerConfig) -> Self {
        let (balances, history) = match config.store_latency {
            Some(latency) => (
                BalanceTable::with_latency(latency),
                HistoryTable::with_latency(latency),
            ),
            None => (BalanceTable::new(), HistoryTable::new()),
        };
        Self::with_stores(balances, history, config.reclaim)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: BalanceStore, H: HistoryStore> Ledger<B, H> {
    /// Creates a ledger over caller-provided stores.
    pub fn with_stores(balances: B, history: H, reclaim: ReclaimPolicy) -> Self {
        Self {
            balances,
            history,
            locks: LockRegistry::with_policy(reclaim),
        }
    }

    /// Returns the user's current balance, zero if never written.
    pub fn balance(&self, user_id: UserId) -> Balance {
        self.balances.select_by_id(user_id)
    }

    /// Returns the user's transaction history in the order it was applied.
    pub fn history(&self, user_id: UserId) -> Vec<TransactionRecord> {
        self.history.select_all_by_user_id(user_id)
    }

    /// Applies a charge or use of `amount` points to the user's balance.
    ///
    /// Blocks until no other mutation for the same user is in progress.
    ///
    /// # Errors
    ///
    /// - [`PointError::InvalidAmount`] - `amount` is zero or negative. No lock is taken.
    /// - [`PointError::InsufficientBalance`] - a use exceeds the current balance.
    /// - [`PointError::BalanceOverflow`] - a charge exceeds `u64::MAX`.
    ///
    /// On error neither the balance nor the history changes.
    pub fn mutate(
        &self,
        user_id: UserId,
        amount: i64,
        kind: TransactionKind,
    ) -> Result<Balance, PointError> {
        if amount <= 0 {
            debug!(user = %user_id, amount, %kind, "rejected non-positive amount");
            return Err(PointError::InvalidAmount);
        }
        let amount = amount as u64;

        let _guard = self.locks.acquire(user_id);

        let current = self.balances.select_by_id(user_id);
        let updated = match transition(current.amount, amount, kind) {
            Ok(updated) => updated,
            Err(err) => {
                debug!(user = %user_id, amount, %kind, error = %err, "rejected mutation");
                return Err(err);
            }
        };

        // Never step back past this user's last write, even if the wall clock does.
        let timestamp = now_millis().max(current.updated_at);
        let balance = self.balances.insert_or_update(user_id, updated, timestamp);
        let record = self.history.insert(user_id, amount, kind, timestamp);
        trace!(
            user = %user_id,
            record = record.id,
            amount,
            %kind,
            balance = balance.amount,
            "applied mutation"
        );

        Ok(balance)
    }

    /// Adds `amount` points. See [`Ledger::mutate`].
    pub fn charge(&self, user_id: UserId, amount: i64) -> Result<Balance, PointError> {
        self.mutate(user_id, amount, TransactionKind::Charge)
    }

    /// Removes `amount` points. See [`Ledger::mutate`].
    pub fn use_points(&self, user_id: UserId, amount: i64) -> Result<Balance, PointError> {
        self.mutate(user_id, amount, TransactionKind::Use)
    }

    pub fn balance_store(&self) -> &B {
        &self.balances
    }

    pub fn history_store(&self) -> &H {
        &self.history
    }

    pub fn lock_registry(&self) -> &LockRegistry {
        &self.locks
    }
}

/// Computes the balance after applying one mutation.
fn transition(current: u64, amount: u64, kind: TransactionKind) -> Result<u64, PointError> {
    match kind {
        TransactionKind::Charge => current
            .checked_add(amount)
            .ok_or(PointError::BalanceOverflow),
        TransactionKind::Use => current
            .checked_sub(amount)
            .ok_or(PointError::InsufficientBalance {
                requested: amount,
                available: current,
            }),
    }
}
