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

//! Ledger configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the [`LockRegistry`](crate::LockRegistry) does with a user's lock once
/// nobody holds or waits on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReclaimPolicy {
    /// Remove the entry, bounding the registry to users with outstanding work.
    #[default]
    Reclaim,
    /// Keep every entry for the lifetime of the registry.
    Retain,
}

/// Configuration for a [`Ledger`](crate::Ledger) built with
/// [`Ledger::with_config`](crate::Ledger::with_config).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Lock registry reclamation policy.
    pub reclaim: ReclaimPolicy,

    /// Artificial per-call latency for the in-memory stores.
    pub store_latency: Option<Duration>,
}

impl LedgerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reclaim(mut self, policy: ReclaimPolicy) -> Self {
        self.reclaim = policy;
        self
    }

    pub fn store_latency(mut self, latency: Duration) -> Self {
        self.store_latency = Some(latency);
        self
    }
}
