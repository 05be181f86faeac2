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

//! Revenue accrual records.
//!
//! Each accrual event appends one immutable [`RevenueEntry`] to the creator's
//! ledger. The entry log is the source of truth; the account summary totals
//! are a cache kept consistent in the same critical section as the append.

use crate::base::{CampaignId, CreatorId, EntryId};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where an accrual came from. Closed set: adding a source is a
/// compile-time-checked change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RevenueSource {
    /// Bonus for referring another creator or backer.
    ReferralBonus,
    /// Platform fee share paid out when a campaign succeeds.
    CampaignSuccess,
    /// Direct tip-jar receipt.
    TipJar,
}

impl RevenueSource {
    /// All sources, in subtotal-reporting order.
    pub const ALL: [RevenueSource; 3] = [
        RevenueSource::ReferralBonus,
        RevenueSource::CampaignSuccess,
        RevenueSource::TipJar,
    ];

    /// Stable tag used in CSV and JSON payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReferralBonus => "referral_bonus",
            Self::CampaignSuccess => "campaign_success",
            Self::TipJar => "tip_jar",
        }
    }
}

impl fmt::Display for RevenueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RevenueSource {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "referral_bonus" => Ok(Self::ReferralBonus),
            "campaign_success" => Ok(Self::CampaignSuccess),
            "tip_jar" => Ok(Self::TipJar),
            _ => Err(LedgerError::InvalidSource),
        }
    }
}

/// Immutable ledger entry recording one accrual event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevenueEntry {
    pub id: EntryId,
    pub creator_id: CreatorId,
    /// Campaign the revenue originated from. Informational.
    pub campaign_id: CampaignId,
    /// Always positive; validated before the entry is created.
    pub amount: Decimal,
    pub source: RevenueSource,
    pub created_at: DateTime<Utc>,
}
