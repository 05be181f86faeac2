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

//! Creator revenue ledger engine.
//!
//! The [`Ledger`] owns every creator account and exposes the three service
//! surfaces of the subsystem:
//!
//! - **Revenue accrual**: [`Ledger::add_revenue`] appends a ledger entry and
//!   updates the cached totals in one critical section.
//! - **Payout management**: [`Ledger::request_payout`] and the processor
//!   callbacks drive the payout state machine. The balance check and the
//!   reservation happen under the same account lock, so two concurrent
//!   requests can never jointly overdraw an account.
//! - **Reporting**: earnings summaries, breakdowns, payout history, and
//!   trailing-window stats, all computed from point-in-time snapshots.
//!
//! # Thread Safety
//!
//! Accounts live in a [`DashMap`], so operations on different creators run in
//! parallel; operations on one creator serialize on that account's mutex.

use crate::account::{self, Account};
use crate::balance::{EarningsSummary, RevenueStats};
use crate::base::{CampaignId, CreatorId, EntryId, PayoutId};
use crate::error::LedgerError;
use crate::payout::{PayoutRequest, PayoutStatus};
use crate::revenue::{RevenueEntry, RevenueSource};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicU64, Ordering};

/// Read-only seam to the external campaign service, used to decorate
/// breakdown rows with campaign titles.
pub trait CampaignLookup {
    fn title(&self, campaign_id: CampaignId) -> Option<String>;
}

/// Ledger tunables.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Smallest withdrawal amount the system accepts, in the configured
    /// currency denomination.
    pub min_payout_threshold: Decimal,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            min_payout_threshold: dec!(10.00),
        }
    }
}

/// Revenue ledger engine managing creator accounts and payout requests.
///
/// # Invariants
///
/// - Entry and payout ids are globally unique and monotonically increasing.
/// - `total_paid <= total_earnings` for every account, always.
/// - An account's reserved balance equals the sum of its open
///   (`Pending`/`Processing`) payout amounts.
/// - `available + reserved + total_paid == total_earnings` (conservation).
pub struct Ledger {
    /// Creator accounts indexed by creator id.
    accounts: DashMap<CreatorId, Account>,
    /// Routes a payout id to the account that owns it.
    payout_owners: DashMap<PayoutId, CreatorId>,
    next_entry_id: AtomicU64,
    next_payout_id: AtomicU64,
    config: LedgerConfig,
}

impl Ledger {
    /// Creates an empty ledger with the default configuration.
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        Ledger {
            accounts: DashMap::new(),
            payout_owners: DashMap::new(),
            next_entry_id: AtomicU64::new(1),
            next_payout_id: AtomicU64::new(1),
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Records a revenue accrual event for a creator.
    ///
    /// Appends a [`RevenueEntry`] and increments `total_earnings` plus the
    /// matching per-source subtotal under the account lock, creating the
    /// account if this is the creator's first accrual. Called only by trusted
    /// internal triggers, never directly by end users.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] if the amount is not positive or
    /// carries more than two fractional digits. No state changes on failure.
    pub fn add_revenue(
        &self,
        creator_id: CreatorId,
        amount: Decimal,
        source: RevenueSource,
        campaign_id: CampaignId,
    ) -> Result<EntryId, LedgerError> {
        self.add_revenue_at(creator_id, amount, source, campaign_id, Utc::now())
    }

    fn add_revenue_at(
        &self,
        creator_id: CreatorId,
        amount: Decimal,
        source: RevenueSource,
        campaign_id: CampaignId,
        created_at: DateTime<Utc>,
    ) -> Result<EntryId, LedgerError> {
        // Rejected before the accounts map is touched: a failed accrual must
        // not create an empty account for a creator who never earned.
        account::validate_amount(amount)?;

        let entry_id = EntryId(self.next_entry_id.fetch_add(1, Ordering::SeqCst));
        let entry = RevenueEntry {
            id: entry_id,
            creator_id,
            campaign_id,
            amount,
            source,
            created_at,
        };

        let mut account = self
            .accounts
            .entry(creator_id)
            .or_insert_with(|| Account::new(creator_id));
        account.accrue(entry)?;
        Ok(entry_id)
    }

    /// Derived earnings figures for a creator.
    ///
    /// Creates the account lazily on first query, so a creator who has never
    /// earned sees an all-zero summary rather than an error.
    pub fn calculate_earnings(&self, creator_id: CreatorId) -> EarningsSummary {
        self.accounts
            .entry(creator_id)
            .or_insert_with(|| Account::new(creator_id))
            .summary()
    }

    /// Ledger entries for a creator, most recent first.
    pub fn get_revenue_breakdown(
        &self,
        creator_id: CreatorId,
    ) -> Result<Vec<RevenueEntry>, LedgerError> {
        let account = self
            .accounts
            .get(&creator_id)
            .ok_or(LedgerError::AccountNotFound)?;
        Ok(account.breakdown())
    }

    /// Breakdown rows joined with campaign titles from the external
    /// campaign service.
    pub fn breakdown_with_titles<L: CampaignLookup>(
        &self,
        creator_id: CreatorId,
        campaigns: &L,
    ) -> Result<Vec<(RevenueEntry, Option<String>)>, LedgerError> {
        let entries = self.get_revenue_breakdown(creator_id)?;
        Ok(entries
            .into_iter()
            .map(|entry| {
                let title = campaigns.title(entry.campaign_id);
                (entry, title)
            })
            .collect())
    }

    /// Payout requests for a creator, most recently requested first.
    pub fn get_payout_history(
        &self,
        creator_id: CreatorId,
    ) -> Result<Vec<PayoutRequest>, LedgerError> {
        let account = self
            .accounts
            .get(&creator_id)
            .ok_or(LedgerError::AccountNotFound)?;
        Ok(account.payout_history())
    }

    /// Creates a payout request in `Pending` state and reserves its amount.
    ///
    /// The threshold check, the reserved-aware balance check, and the
    /// reservation all run inside the account's critical section: of several
    /// concurrent requests, exactly as many as fit the available balance
    /// succeed.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AccountNotFound`] - the creator has no account.
    /// - [`LedgerError::BelowMinimumThreshold`] - amount under the configured minimum.
    /// - [`LedgerError::InsufficientAvailableBalance`] - amount exceeds what is withdrawable.
    /// - [`LedgerError::InvalidAmount`] - non-positive or sub-cent amount.
    pub fn request_payout(
        &self,
        creator_id: CreatorId,
        amount: Decimal,
        bank_details: impl Into<String>,
    ) -> Result<PayoutId, LedgerError> {
        let mut account = self
            .accounts
            .get_mut(&creator_id)
            .ok_or(LedgerError::AccountNotFound)?;

        // Id allocated inside the critical section, so id order matches
        // arrival order for any single account.
        let payout_id = PayoutId(self.next_payout_id.fetch_add(1, Ordering::SeqCst));
        let request = PayoutRequest {
            id: payout_id,
            creator_id,
            amount,
            status: PayoutStatus::Pending,
            bank_details: bank_details.into(),
            requested_at: Utc::now(),
            processed_at: None,
            completed_at: None,
            notes: None,
        };
        account.request_payout(request, self.config.min_payout_threshold)?;

        // Directory entry is added while the account lock is still held, so
        // the id is routable by the time the request is observable as
        // pending. Lock order account -> directory cannot cycle: `owner_of`
        // copies the owner out and never holds a directory ref across an
        // account lock.
        self.payout_owners.insert(payout_id, creator_id);
        Ok(payout_id)
    }

    /// Marks a payout as picked up by the payment processor
    /// (`Pending → Processing`). Funds stay reserved.
    pub fn start_payout_processing(&self, payout_id: PayoutId) -> Result<(), LedgerError> {
        let creator_id = self.owner_of(payout_id)?;
        let mut account = self
            .accounts
            .get_mut(&creator_id)
            .ok_or(LedgerError::PayoutNotFound)?;
        account.start_processing(payout_id, Utc::now())
    }

    /// Records a confirmed transfer (`Processing → Completed`): `total_paid`
    /// absorbs the amount and the reservation is released atomically.
    pub fn complete_payout_request(&self, payout_id: PayoutId) -> Result<(), LedgerError> {
        let creator_id = self.owner_of(payout_id)?;
        let mut account = self
            .accounts
            .get_mut(&creator_id)
            .ok_or(LedgerError::PayoutNotFound)?;
        account.complete_payout(payout_id, Utc::now())
    }

    /// Records a rejected or cancelled payout (`Pending`/`Processing →
    /// Failed`), releasing the reservation and storing the reason.
    pub fn fail_payout_request(
        &self,
        payout_id: PayoutId,
        reason: &str,
    ) -> Result<(), LedgerError> {
        let creator_id = self.owner_of(payout_id)?;
        let mut account = self
            .accounts
            .get_mut(&creator_id)
            .ok_or(LedgerError::PayoutNotFound)?;
        account.fail_payout(payout_id, reason, Utc::now())
    }

    /// All `Pending` requests across creators, first-requested first.
    /// Polled by the payment processor to drain the queue in order.
    pub fn get_pending_payout_requests(&self) -> Vec<PayoutRequest> {
        let mut pending: Vec<PayoutRequest> = self
            .accounts
            .iter()
            .flat_map(|account| account.pending_payouts())
            .collect();
        pending.sort_by(|a, b| a.requested_at.cmp(&b.requested_at).then(a.id.cmp(&b.id)));
        pending
    }

    /// Fetches one payout request by id.
    pub fn get_payout(&self, payout_id: PayoutId) -> Result<PayoutRequest, LedgerError> {
        let creator_id = self.owner_of(payout_id)?;
        let account = self
            .accounts
            .get(&creator_id)
            .ok_or(LedgerError::PayoutNotFound)?;
        account.payout(payout_id).ok_or(LedgerError::PayoutNotFound)
    }

    /// Trailing 30/90 day earnings and month-over-month trend.
    pub fn get_revenue_stats(&self, creator_id: CreatorId) -> Result<RevenueStats, LedgerError> {
        let account = self
            .accounts
            .get(&creator_id)
            .ok_or(LedgerError::AccountNotFound)?;
        Ok(account.stats_at(Utc::now()))
    }

    /// Audit pass: recomputes every account's totals from its entry log and
    /// payout records. Returns the creators whose cached summaries drifted
    /// (empty unless there is a bug).
    pub fn reconcile_all(&self) -> Vec<CreatorId> {
        self.accounts
            .iter()
            .filter(|account| !account.reconcile())
            .map(|account| account.creator_id())
            .collect()
    }

    /// Returns an iterator over all creator accounts.
    ///
    /// Useful for generating output reports of account states.
    pub fn accounts(
        &self,
    ) -> impl Iterator<Item = dashmap::mapref::multiple::RefMulti<'_, CreatorId, Account>> {
        self.accounts.iter()
    }

    /// Retrieves a creator account by id, without creating it.
    pub fn get_account(
        &self,
        creator_id: &CreatorId,
    ) -> Option<dashmap::mapref::one::Ref<'_, CreatorId, Account>> {
        self.accounts.get(creator_id)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    // The owners directory is only read through a copied value so no
    // directory guard is ever held while an account lock is taken.
    fn owner_of(&self, payout_id: PayoutId) -> Result<CreatorId, LedgerError> {
        self.payout_owners
            .get(&payout_id)
            .map(|owner| *owner)
            .ok_or(LedgerError::PayoutNotFound)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
