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

//! Creator revenue account.
//!
//! One [`Account`] per creator, guarded by a mutex: every mutating operation
//! for that creator runs in a critical section, so the balance check and the
//! reservation of `request_payout` are a single atomic step. Operations on
//! different creators never contend.
//!
//! Payout state machine held per account:
//!
//  Payout (Pending) ──process──► Payout (Processing) ──complete──► Payout (Completed) + paid
//         │                             │
//         └────────────fail────────────┴──► Payout (Failed) + reservation released

use crate::balance::{self, EarningsSummary, RevenueStats, DECIMAL_PRECISION};
use crate::base::{CreatorId, PayoutId};
use crate::error::LedgerError;
use crate::payout::{PayoutRequest, PayoutStatus};
use crate::revenue::{RevenueEntry, RevenueSource};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::ser::{Serialize, Serializer};
use std::collections::HashMap;

#[derive(Debug)]
struct AccountData {
    creator_id: CreatorId,
    total_earnings: Decimal,
    total_paid: Decimal,
    referral_bonus: Decimal,
    campaign_success_fees: Decimal,
    tip_jar_earnings: Decimal,
    /// Sum of amounts in Pending/Processing payout requests.
    reserved: Decimal,
    /// Append-only accrual log; source of truth for the totals above.
    entries: Vec<RevenueEntry>,
    /// Payout requests indexed by id for state transitions.
    payouts: HashMap<PayoutId, PayoutRequest>,
}

impl AccountData {
    fn new(creator_id: CreatorId) -> Self {
        Self {
            creator_id,
            total_earnings: Decimal::ZERO,
            total_paid: Decimal::ZERO,
            referral_bonus: Decimal::ZERO,
            campaign_success_fees: Decimal::ZERO,
            tip_jar_earnings: Decimal::ZERO,
            reserved: Decimal::ZERO,
            entries: Vec::new(),
            payouts: HashMap::new(),
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.total_paid <= self.total_earnings,
            "Invariant violated: total_paid {} exceeds total_earnings {}",
            self.total_paid,
            self.total_earnings
        );
        debug_assert!(
            self.referral_bonus + self.campaign_success_fees + self.tip_jar_earnings
                == self.total_earnings,
            "Invariant violated: per-source subtotals do not sum to total_earnings"
        );
        debug_assert!(
            self.reserved >= Decimal::ZERO,
            "Invariant violated: reserved went negative: {}",
            self.reserved
        );
        debug_assert!(
            self.reserved <= self.total_earnings - self.total_paid,
            "Invariant violated: reserved {} exceeds pending balance {}",
            self.reserved,
            self.total_earnings - self.total_paid
        );
    }

    fn total_pending(&self) -> Decimal {
        self.total_earnings - self.total_paid
    }

    fn available_for_payout(&self) -> Decimal {
        balance::available_for_payout(self.total_pending(), self.reserved)
    }

    fn subtotal_mut(&mut self, source: RevenueSource) -> &mut Decimal {
        match source {
            RevenueSource::ReferralBonus => &mut self.referral_bonus,
            RevenueSource::CampaignSuccess => &mut self.campaign_success_fees,
            RevenueSource::TipJar => &mut self.tip_jar_earnings,
        }
    }

    /// Appends an entry and bumps the cached totals in one step.
    fn accrue(&mut self, entry: RevenueEntry) -> Result<(), LedgerError> {
        validate_amount(entry.amount)?;
        self.total_earnings += entry.amount;
        *self.subtotal_mut(entry.source) += entry.amount;
        self.entries.push(entry);
        self.assert_invariants();
        Ok(())
    }

    /// Checks the threshold and the reserved-aware balance, then reserves the
    /// amount and records the request. All-or-nothing.
    fn request_payout(
        &mut self,
        request: PayoutRequest,
        min_threshold: Decimal,
    ) -> Result<(), LedgerError> {
        validate_amount(request.amount)?;
        if request.amount < min_threshold {
            return Err(LedgerError::BelowMinimumThreshold);
        }
        if request.amount > self.available_for_payout() {
            return Err(LedgerError::InsufficientAvailableBalance);
        }
        self.reserved += request.amount;
        self.payouts.insert(request.id, request);
        self.assert_invariants();
        Ok(())
    }

    /// Pending -> Processing. No balance effect; funds stay reserved.
    fn start_processing(
        &mut self,
        payout_id: PayoutId,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let payout = self
            .payouts
            .get_mut(&payout_id)
            .ok_or(LedgerError::PayoutNotFound)?;
        if payout.status != PayoutStatus::Pending {
            return Err(LedgerError::InvalidStateTransition {
                from: payout.status,
            });
        }
        payout.status = PayoutStatus::Processing;
        payout.processed_at = Some(now);
        Ok(())
    }

    /// Processing -> Completed. Moves the reservation into total_paid.
    fn complete_payout(
        &mut self,
        payout_id: PayoutId,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let payout = self
            .payouts
            .get_mut(&payout_id)
            .ok_or(LedgerError::PayoutNotFound)?;
        if payout.status != PayoutStatus::Processing {
            return Err(LedgerError::InvalidStateTransition {
                from: payout.status,
            });
        }
        payout.status = PayoutStatus::Completed;
        payout.completed_at = Some(now);
        let amount = payout.amount;
        self.total_paid += amount;
        self.reserved -= amount;
        self.assert_invariants();
        Ok(())
    }

    /// Pending/Processing -> Failed. Releases the reservation untouched.
    fn fail_payout(
        &mut self,
        payout_id: PayoutId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let payout = self
            .payouts
            .get_mut(&payout_id)
            .ok_or(LedgerError::PayoutNotFound)?;
        if !payout.status.is_open() {
            return Err(LedgerError::InvalidStateTransition {
                from: payout.status,
            });
        }
        payout.status = PayoutStatus::Failed;
        payout.completed_at = Some(now);
        payout.notes = Some(reason.to_owned());
        let amount = payout.amount;
        self.reserved -= amount;
        self.assert_invariants();
        Ok(())
    }

    fn summary(&self) -> EarningsSummary {
        EarningsSummary {
            creator_id: self.creator_id,
            total_earnings: self.total_earnings,
            referral_bonus: self.referral_bonus,
            campaign_success_fees: self.campaign_success_fees,
            tip_jar_earnings: self.tip_jar_earnings,
            total_paid: self.total_paid,
            total_pending: self.total_pending(),
            reserved: self.reserved,
            available_for_payout: self.available_for_payout(),
        }
    }

    /// Recomputes every cached figure from the entry log and payout records
    /// and compares against the cache. True when nothing drifted.
    fn reconcile(&self) -> bool {
        let mut earned = Decimal::ZERO;
        let mut by_source = [Decimal::ZERO; 3];
        for entry in &self.entries {
            earned += entry.amount;
            let idx = RevenueSource::ALL
                .iter()
                .position(|s| *s == entry.source)
                .unwrap_or(0);
            by_source[idx] += entry.amount;
        }

        let mut paid = Decimal::ZERO;
        let mut reserved = Decimal::ZERO;
        for payout in self.payouts.values() {
            match payout.status {
                PayoutStatus::Completed => paid += payout.amount,
                PayoutStatus::Pending | PayoutStatus::Processing => reserved += payout.amount,
                PayoutStatus::Failed => {}
            }
        }

        earned == self.total_earnings
            && by_source[0] == self.referral_bonus
            && by_source[1] == self.campaign_success_fees
            && by_source[2] == self.tip_jar_earnings
            && paid == self.total_paid
            && reserved == self.reserved
    }
}

/// Rejects non-positive amounts and sub-cent precision.
pub(crate) fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO || amount.normalize().scale() > DECIMAL_PRECISION {
        return Err(LedgerError::InvalidAmount);
    }
    Ok(())
}

/// Per-creator revenue account.
#[derive(Debug)]
pub struct Account {
    inner: Mutex<AccountData>,
}

impl Account {
    pub fn new(creator_id: CreatorId) -> Self {
        Self {
            inner: Mutex::new(AccountData::new(creator_id)),
        }
    }

    pub fn creator_id(&self) -> CreatorId {
        self.inner.lock().creator_id
    }

    pub fn total_earnings(&self) -> Decimal {
        self.inner.lock().total_earnings
    }

    pub fn total_paid(&self) -> Decimal {
        self.inner.lock().total_paid
    }

    /// `total_earnings - total_paid`.
    pub fn total_pending(&self) -> Decimal {
        self.inner.lock().total_pending()
    }

    pub fn reserved(&self) -> Decimal {
        self.inner.lock().reserved
    }

    pub fn available_for_payout(&self) -> Decimal {
        self.inner.lock().available_for_payout()
    }

    /// Point-in-time snapshot of every derived figure.
    pub fn summary(&self) -> EarningsSummary {
        self.inner.lock().summary()
    }

    /// Ledger entries, most recent first.
    pub fn breakdown(&self) -> Vec<RevenueEntry> {
        let data = self.inner.lock();
        let mut entries = data.entries.clone();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));
        entries
    }

    /// Payout requests, most recently requested first.
    pub fn payout_history(&self) -> Vec<PayoutRequest> {
        let data = self.inner.lock();
        let mut payouts: Vec<_> = data.payouts.values().cloned().collect();
        payouts.sort_by(|a, b| b.requested_at.cmp(&a.requested_at).then(b.id.cmp(&a.id)));
        payouts
    }

    /// Pending requests, first-requested first.
    pub fn pending_payouts(&self) -> Vec<PayoutRequest> {
        let data = self.inner.lock();
        let mut payouts: Vec<_> = data
            .payouts
            .values()
            .filter(|p| p.status == PayoutStatus::Pending)
            .cloned()
            .collect();
        payouts.sort_by(|a, b| a.requested_at.cmp(&b.requested_at).then(a.id.cmp(&b.id)));
        payouts
    }

    pub fn payout(&self, payout_id: PayoutId) -> Option<PayoutRequest> {
        self.inner.lock().payouts.get(&payout_id).cloned()
    }

    /// Trailing-window stats computed from the entry log.
    pub fn stats_at(&self, now: DateTime<Utc>) -> RevenueStats {
        balance::revenue_stats_at(&self.inner.lock().entries, now)
    }

    pub fn accrue(&mut self, entry: RevenueEntry) -> Result<(), LedgerError> {
        self.inner.lock().accrue(entry)
    }

    pub fn request_payout(
        &mut self,
        request: PayoutRequest,
        min_threshold: Decimal,
    ) -> Result<(), LedgerError> {
        self.inner.lock().request_payout(request, min_threshold)
    }

    pub fn start_processing(
        &mut self,
        payout_id: PayoutId,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.inner.lock().start_processing(payout_id, now)
    }

    pub fn complete_payout(
        &mut self,
        payout_id: PayoutId,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.inner.lock().complete_payout(payout_id, now)
    }

    pub fn fail_payout(
        &mut self,
        payout_id: PayoutId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.inner.lock().fail_payout(payout_id, reason, now)
    }

    /// Audit fallback: true when the cached totals match a recomputation
    /// from the entry log and payout records.
    pub fn reconcile(&self) -> bool {
        self.inner.lock().reconcile()
    }
}

impl Serialize for Account {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.summary().serialize(serializer)
    }
}
