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

//! Transaction kinds and history records.
//!
//! A [`TransactionRecord`] is written for every successful mutation and never
//! changes afterwards. Failed mutations leave no record.

use crate::PointError;
use crate::base::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a point mutation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Adds points to the balance.
    Charge,
    /// Removes points from the balance; fails if the balance is too low.
    Use,
}

impl TransactionKind {
    /// Legacy numeric code used by older clients.
    pub fn code(&self) -> u8 {
        match self {
            Self::Charge => 1,
            Self::Use => 2,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Charge => f.write_str("charge"),
            Self::Use => f.write_str("use"),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = PointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "charge" => Ok(Self::Charge),
            "use" => Ok(Self::Use),
            _ => Err(PointError::InvalidTransactionKind),
        }
    }
}

impl TryFrom<u8> for TransactionKind {
    type Error = PointError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Charge),
            2 => Ok(Self::Use),
            _ => Err(PointError::InvalidTransactionKind),
        }
    }
}

/// One applied mutation in a user's history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Store-assigned sequence number, strictly increasing across all users.
    pub id: u64,
    pub user_id: UserId,
    /// Always positive.
    pub amount: u64,
    pub kind: TransactionKind,
    /// Wall-clock milliseconds at which the mutation was applied.
    pub timestamp: u64,
}
