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

//! # Creator Ledger
//!
//! This library provides the revenue ledger and payout subsystem for a
//! crowdfunding platform: an append-only accounting of creator earnings
//! (referral bonuses, campaign-success fees, tip-jar receipts), derived
//! balance computation, and a payout-request state machine that never lets
//! withdrawals exceed what a creator has actually earned, even under
//! concurrent requests.
//!
//! ## Core Components
//!
//! - [`Ledger`]: Central engine managing creator accounts and payouts
//! - [`Account`]: Per-creator aggregate with entry log and reservations
//! - [`RevenueSource`]: Closed set of accrual kinds
//! - [`PayoutStatus`]: Payout request lifecycle states
//! - [`LedgerError`]: Error taxonomy for all operations
//!
//! ## Example
//!
//! ```
//! use creator_ledger_rs::{CampaignId, CreatorId, Ledger, RevenueSource};
//! use rust_decimal_macros::dec;
//!
//! let ledger = Ledger::new();
//!
//! // Accrue campaign-success revenue
//! ledger
//!     .add_revenue(CreatorId(1), dec!(25.00), RevenueSource::CampaignSuccess, CampaignId(7))
//!     .unwrap();
//!
//! // The creator withdraws it
//! let payout = ledger.request_payout(CreatorId(1), dec!(25.00), "iban:XX00").unwrap();
//! ledger.start_payout_processing(payout).unwrap();
//! ledger.complete_payout_request(payout).unwrap();
//!
//! let summary = ledger.calculate_earnings(CreatorId(1));
//! assert_eq!(summary.total_paid, dec!(25.00));
//! assert_eq!(summary.total_pending, dec!(0.00));
//! ```
//!
//! ## Thread Safety
//!
//! Mutating operations on one creator's account are serialized on that
//! account's lock; operations on different creators proceed in parallel. A
//! payout request's balance check and fund reservation share one critical
//! section, which is what makes concurrent over-withdrawal impossible.

pub mod account;
mod balance;
mod base;
pub mod error;
mod ledger;
mod payout;
mod revenue;

pub use account::Account;
pub use balance::{DECIMAL_PRECISION, EarningsSummary, RevenueStats};
pub use base::{CampaignId, CreatorId, EntryId, PayoutId};
pub use error::LedgerError;
pub use ledger::{CampaignLookup, Ledger, LedgerConfig};
pub use payout::{PayoutRequest, PayoutStatus};
pub use revenue::{RevenueEntry, RevenueSource};
