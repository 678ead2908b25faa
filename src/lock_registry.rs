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

//! Per-user lock registry.
//!
//! The registry hands out one exclusive lock per [`UserId`]. Locks are created
//! lazily on first use and, under [`ReclaimPolicy::Reclaim`], removed again as
//! soon as nobody holds or waits on them.
//!
//! # Reclamation
//!
//! Every caller clones the lock's [`Arc`] while holding the map shard lock
//! taken by `entry()`. Reclamation runs [`DashMap::remove_if`] under the same
//! shard lock and only removes an entry whose `Arc` is held by the map alone.
//! A holder or waiter always owns a clone, so its entry can never be removed
//! from under it, and at most one live lock exists per user at any time.
//!
//! ```
//! use point_ledger::{LockRegistry, UserId};
//!
//! let registry = LockRegistry::new();
//! {
//!     let _guard = registry.acquire(UserId(1));
//!     assert!(registry.contains(UserId(1)));
//! }
//! assert!(registry.is_empty());
//! ```

use crate::ReclaimPolicy;
use crate::base::UserId;
use dashmap::DashMap;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Maps users to their exclusive mutation lock.
pub struct LockRegistry {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
    policy: ReclaimPolicy,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::with_policy(ReclaimPolicy::default())
    }

    pub fn with_policy(policy: ReclaimPolicy) -> Self {
        Self {
            locks: DashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> ReclaimPolicy {
        self.policy
    }

    /// Blocks until the user's lock is free, then returns a guard holding it.
    ///
    /// The lock is released when the guard is dropped.
    pub fn acquire(&self, user_id: UserId) -> LockGuard<'_> {
        // The clone must happen while `entry()` holds the shard lock.
        let lock = Arc::clone(
            self.locks
                .entry(user_id)
                .or_insert_with(|| {
                    debug!(user = %user_id, "creating user lock");
                    Arc::new(Mutex::new(()))
                })
                .value(),
        );

        LockGuard {
            registry: self,
            user_id,
            guard: Some(lock.lock_arc()),
        }
    }

    /// Number of users that currently have a lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.locks.contains_key(&user_id)
    }

    /// Removes the user's entry if nobody but the map references it.
    fn reclaim(&self, user_id: UserId) {
        if self.policy == ReclaimPolicy::Retain {
            return;
        }
        let removed = self
            .locks
            .remove_if(&user_id, |_, lock| Arc::strong_count(lock) == 1);
        if removed.is_some() {
            trace!(user = %user_id, "reclaimed user lock");
        }
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockRegistry")
            .field("entries", &self.locks.len())
            .field("policy", &self.policy)
            .finish()
    }
}

/// Exclusive hold on one user's lock.
///
/// Dropping the guard unlocks and then offers the entry for reclamation.
#[must_use = "the user lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    registry: &'a LockRegistry,
    user_id: UserId,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl LockGuard<'_> {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Releases the lock. Equivalent to dropping the guard.
    pub fn release(self) {}
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        // Unlock and drop our Arc first so an idle entry has a count of one.
        drop(self.guard.take());
        self.registry.reclaim(self.user_id);
    }
}

impl fmt::Debug for LockGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("user_id", &self.user_id)
            .finish()
    }
}
