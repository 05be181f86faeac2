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

//! Payout request records.
//!
//! Payouts follow a state machine:
//! - [`Pending`] → [`Processing`] (picked up by the payment processor)
//! - [`Processing`] → [`Completed`] (transfer confirmed)
//! - [`Pending`] or [`Processing`] → [`Failed`] (rejected or cancelled)
//!
//! `Completed` and `Failed` are terminal; no transition leaves them.
//! From the instant a request is created its amount is reserved against the
//! creator's pending balance, and the reservation is released only on a
//! terminal transition.
//!
//! [`Pending`]: PayoutStatus::Pending
//! [`Processing`]: PayoutStatus::Processing
//! [`Completed`]: PayoutStatus::Completed
//! [`Failed`]: PayoutStatus::Failed

use crate::base::{CreatorId, PayoutId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl PayoutStatus {
    /// Terminal states absorb: no transition leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// States whose amount counts toward the creator's reserved balance.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

/// A creator's withdrawal request, tracked through its status lifecycle.
///
/// `amount` is immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PayoutRequest {
    pub id: PayoutId,
    pub creator_id: CreatorId,
    pub amount: Decimal,
    pub status: PayoutStatus,
    /// Opaque destination descriptor; the ledger never interprets it.
    pub bank_details: String,
    pub requested_at: DateTime<Utc>,
    /// Set when the request enters `Processing`.
    pub processed_at: Option<DateTime<Utc>>,
    /// Set when the request reaches a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Failure reason, set by `fail_payout_request`.
    pub notes: Option<String>,
}
