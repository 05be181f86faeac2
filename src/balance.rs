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

//! Read models derived from the ledger summary state.
//!
//! Everything here is pure: snapshots are computed under the account lock and
//! handed out by value, so readers never hold a lock while rendering.

use crate::base::CreatorId;
use crate::revenue::{RevenueEntry, RevenueSource};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::Deserialize;

/// Currency amounts carry at most this many fractional digits.
pub const DECIMAL_PRECISION: u32 = 2;

/// Point-in-time earnings figures for one creator.
///
/// Conservation law: `available_for_payout + reserved + total_paid ==
/// total_earnings` whenever the reservation invariant holds (reserved never
/// exceeds the pending balance).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarningsSummary {
    pub creator_id: CreatorId,
    pub total_earnings: Decimal,
    pub referral_bonus: Decimal,
    pub campaign_success_fees: Decimal,
    pub tip_jar_earnings: Decimal,
    pub total_paid: Decimal,
    /// `total_earnings - total_paid`.
    pub total_pending: Decimal,
    /// Sum of amounts tied up in `Pending`/`Processing` payout requests.
    pub reserved: Decimal,
    /// `total_pending - reserved`, floored at zero.
    pub available_for_payout: Decimal,
}

impl EarningsSummary {
    /// Subtotal for one revenue source.
    pub fn per_source(&self, source: RevenueSource) -> Decimal {
        match source {
            RevenueSource::ReferralBonus => self.referral_bonus,
            RevenueSource::CampaignSuccess => self.campaign_success_fees,
            RevenueSource::TipJar => self.tip_jar_earnings,
        }
    }
}

impl Serialize for EarningsSummary {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("EarningsSummary", 9)?;
        state.serialize_field("creator", &self.creator_id)?;
        state.serialize_field("total_earnings", &self.total_earnings.round_dp(DECIMAL_PRECISION))?;
        state.serialize_field("referral_bonus", &self.referral_bonus.round_dp(DECIMAL_PRECISION))?;
        state.serialize_field(
            "campaign_success_fees",
            &self.campaign_success_fees.round_dp(DECIMAL_PRECISION),
        )?;
        state.serialize_field(
            "tip_jar_earnings",
            &self.tip_jar_earnings.round_dp(DECIMAL_PRECISION),
        )?;
        state.serialize_field("total_paid", &self.total_paid.round_dp(DECIMAL_PRECISION))?;
        state.serialize_field("total_pending", &self.total_pending.round_dp(DECIMAL_PRECISION))?;
        state.serialize_field("reserved", &self.reserved.round_dp(DECIMAL_PRECISION))?;
        state.serialize_field(
            "available_for_payout",
            &self.available_for_payout.round_dp(DECIMAL_PRECISION),
        )?;
        state.end()
    }
}

/// Trailing-window earnings figures for dashboards.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, Deserialize)]
pub struct RevenueStats {
    /// Earnings accrued in the trailing 30 days.
    pub last_month_earnings: Decimal,
    /// Earnings accrued in the trailing 90 days.
    pub last_quarter_earnings: Decimal,
    /// Trailing 30 days vs the 30 days before, as a percentage rounded to
    /// two decimal places. Zero when the previous window had no earnings.
    pub trend_percentage: Decimal,
}

/// Floors the reserved-aware balance at zero.
pub(crate) fn available_for_payout(total_pending: Decimal, reserved: Decimal) -> Decimal {
    (total_pending - reserved).max(Decimal::ZERO)
}

/// Computes trailing-window stats from the entry log at a given instant.
pub(crate) fn revenue_stats_at(entries: &[RevenueEntry], now: DateTime<Utc>) -> RevenueStats {
    let month_ago = now - Duration::days(30);
    let two_months_ago = now - Duration::days(60);
    let quarter_ago = now - Duration::days(90);

    let mut last_month = Decimal::ZERO;
    let mut previous_month = Decimal::ZERO;
    let mut last_quarter = Decimal::ZERO;

    for entry in entries {
        if entry.created_at > now {
            continue;
        }
        if entry.created_at > quarter_ago {
            last_quarter += entry.amount;
        }
        if entry.created_at > month_ago {
            last_month += entry.amount;
        } else if entry.created_at > two_months_ago {
            previous_month += entry.amount;
        }
    }

    let trend_percentage = if previous_month.is_zero() {
        Decimal::ZERO
    } else {
        ((last_month - previous_month) / previous_month * Decimal::ONE_HUNDRED)
            .round_dp(DECIMAL_PRECISION)
    };

    RevenueStats {
        last_month_earnings: last_month,
        last_quarter_earnings: last_quarter,
        trend_percentage,
    }
}
