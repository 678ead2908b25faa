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

//! Balance and history storage.
//!
//! The ledger engine talks to storage through the [`BalanceStore`] and
//! [`HistoryStore`] traits. [`BalanceTable`] and [`HistoryTable`] are the
//! in-memory implementations; both live for the lifetime of the process.
//!
//! Neither table serializes writes for a user on its own. Callers must hold
//! that user's lock from the [`LockRegistry`](crate::LockRegistry) while
//! writing, which is what the [`Ledger`](crate::Ledger) does.

use crate::base::UserId;
use crate::{Balance, TransactionKind, TransactionRecord};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

/// Current-balance storage keyed by user.
pub trait BalanceStore: Send + Sync {
    /// Returns the user's balance, or a zero balance if none was ever written.
    fn select_by_id(&self, user_id: UserId) -> Balance;

    /// Replaces the user's balance.
    fn insert_or_update(&self, user_id: UserId, amount: u64, updated_at: u64) -> Balance;
}

/// Append-only transaction history keyed by user.
pub trait HistoryStore: Send + Sync {
    /// Appends a record and returns it with its assigned id.
    fn insert(
        &self,
        user_id: UserId,
        amount: u64,
        kind: TransactionKind,
        timestamp: u64,
    ) -> TransactionRecord;

    /// Returns every record for the user in append order.
    fn select_all_by_user_id(&self, user_id: UserId) -> Vec<TransactionRecord>;
}

/// In-memory [`BalanceStore`].
#[derive(Debug, Default)]
pub struct BalanceTable {
    balances: DashMap<UserId, Balance>,
    latency: Option<Duration>,
}

impl BalanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps for `latency` on every call, to simulate a slow backing store.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            balances: DashMap::new(),
            latency: Some(latency),
        }
    }

    /// Number of users with a written balance.
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Snapshot of every written balance, in no particular order.
    pub fn all(&self) -> Vec<Balance> {
        self.balances.iter().map(|entry| *entry.value()).collect()
    }

    fn throttle(&self) {
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }
    }
}

impl BalanceStore for BalanceTable {
    fn select_by_id(&self, user_id: UserId) -> Balance {
        self.throttle();
        self.balances
            .get(&user_id)
            .map(|balance| *balance)
            .unwrap_or_else(|| Balance::empty(user_id))
    }

    fn insert_or_update(&self, user_id: UserId, amount: u64, updated_at: u64) -> Balance {
        self.throttle();
        let balance = Balance {
            user_id,
            amount,
            updated_at,
        };
        self.balances.insert(user_id, balance);
        balance
    }
}

/// In-memory [`HistoryStore`].
///
/// Record ids come from a single atomic cursor, so they are unique and
/// increasing across all users.
#[derive(Debug)]
pub struct HistoryTable {
    records: DashMap<UserId, Vec<TransactionRecord>>,
    /// Next record id to hand out.
    cursor: AtomicU64,
    latency: Option<Duration>,
}

impl HistoryTable {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            cursor: AtomicU64::new(1),
            latency: None,
        }
    }

    /// Sleeps for `latency` on every call, to simulate a slow backing store.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::new()
        }
    }

    /// Total number of records across all users.
    pub fn len(&self) -> usize {
        self.records.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn throttle(&self) {
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }
    }
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore for HistoryTable {
    fn insert(
        &self,
        user_id: UserId,
        amount: u64,
        kind: TransactionKind,
        timestamp: u64,
    ) -> TransactionRecord {
        self.throttle();
        let record = TransactionRecord {
            id: self.cursor.fetch_add(1, Ordering::Relaxed),
            user_id,
            amount,
            kind,
            timestamp,
        };
        self.records.entry(user_id).or_default().push(record);
        record
    }

    fn select_all_by_user_id(&self, user_id: UserId) -> Vec<TransactionRecord> {
        self.throttle();
        self.records
            .get(&user_id)
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}
