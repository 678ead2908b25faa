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

//! Point balances.

use crate::base::UserId;
use serde::{Deserialize, Serialize};

/// Current point balance of one user.
///
/// The amount is unsigned, so a successful mutation can never leave it
/// negative.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Balance {
    pub user_id: UserId,
    pub amount: u64,
    /// Wall-clock milliseconds of the last write; 0 if never written.
    pub updated_at: u64,
}

impl Balance {
    /// Zero balance for a user that has never been written.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            amount: 0,
            updated_at: 0,
        }
    }
}
