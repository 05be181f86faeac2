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

//! Error types for ledger and payout processing.

use crate::payout::PayoutStatus;
use thiserror::Error;

/// Ledger processing errors.
///
/// Validation errors (`InvalidAmount`, `InvalidSource`, `BelowMinimumThreshold`,
/// `InsufficientAvailableBalance`) cause no state change and map to 400-class
/// responses at an API boundary. `AccountNotFound`/`PayoutNotFound` map to
/// 404-class. `InvalidStateTransition` indicates an ordering bug in the
/// calling collaborator and maps to 409-class.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount is zero, negative, or carries more fractional digits than the
    /// currency supports
    #[error("invalid amount (must be positive with at most 2 decimal places)")]
    InvalidAmount,

    /// Revenue source tag is not one of the enumerated kinds
    #[error("unrecognized revenue source")]
    InvalidSource,

    /// No revenue account exists for the creator
    #[error("creator account not found")]
    AccountNotFound,

    /// Referenced payout request does not exist
    #[error("payout request not found")]
    PayoutNotFound,

    /// Requested amount is below the minimum payout threshold
    #[error("payout amount below minimum threshold")]
    BelowMinimumThreshold,

    /// Requested amount exceeds the reserved-aware available balance
    #[error("insufficient available balance for payout")]
    InsufficientAvailableBalance,

    /// Payout is not in a state that permits the requested transition
    #[error("invalid payout state transition from {from:?}")]
    InvalidStateTransition {
        /// Status the payout was in when the transition was attempted.
        from: PayoutStatus,
    },
}
