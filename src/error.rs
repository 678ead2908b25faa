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

//! Error types for point mutations.

use thiserror::Error;

/// Broad class of a [`PointError`].
///
/// Validation errors mean the request itself was malformed. Domain errors mean
/// the request was well-formed but the ledger's current state rejects it.
/// Neither class is retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Domain,
}

/// Point mutation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PointError {
    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Transaction kind is neither charge nor use
    #[error("invalid transaction kind")]
    InvalidTransactionKind,

    /// Use would take the balance below zero
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: u64 },

    /// Charge would exceed the representable balance
    #[error("balance overflow")]
    BalanceOverflow,
}

impl PointError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PointError::InvalidAmount | PointError::InvalidTransactionKind => {
                ErrorCategory::Validation
            }
            PointError::InsufficientBalance { .. } | PointError::BalanceOverflow => {
                ErrorCategory::Domain
            }
        }
    }
}
