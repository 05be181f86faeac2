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

use clap::Parser;
use creator_ledger_rs::{CampaignId, CreatorId, Ledger, PayoutId, RevenueSource};
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;

/// Creator Ledger - Replay ledger event CSV files
///
/// Reads accrual and payout events from a CSV file and outputs final account
/// summaries to stdout. Supports accruals, payout requests, and the payout
/// lifecycle (process, complete, fail).
#[derive(Parser, Debug)]
#[command(name = "creator-ledger-rs")]
#[command(about = "Replays a creator revenue event CSV into account summaries", long_about = None)]
struct Args {
    /// Path to CSV file with ledger events
    ///
    /// Expected format: op,creator,campaign,amount,source,payout,detail
    /// Example: cargo run -- events.csv > summaries.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn main() {
    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let ledger = match replay_events(BufReader::new(file)) {
        Ok(ledger) => ledger,
        Err(e) => {
            eprintln!("Error processing events: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_summaries(&ledger, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `op, creator, campaign, amount, source, payout, detail`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    creator: Option<u32>,
    #[serde(deserialize_with = "csv::invalid_option")]
    campaign: Option<u32>,
    #[serde(deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
    source: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    payout: Option<u64>,
    detail: Option<String>,
}

/// One replayable ledger operation.
#[derive(Debug)]
enum LedgerEvent {
    Accrue {
        creator: CreatorId,
        campaign: CampaignId,
        amount: Decimal,
        source: RevenueSource,
    },
    Request {
        creator: CreatorId,
        amount: Decimal,
        bank_details: String,
    },
    Process {
        payout: PayoutId,
    },
    Complete {
        payout: PayoutId,
    },
    Fail {
        payout: PayoutId,
        reason: String,
    },
}

impl CsvRecord {
    /// Converts a CSV record into a ledger event.
    ///
    /// Returns `None` for unknown ops or missing required fields. Payout
    /// lifecycle rows reference the ledger-assigned payout id, which is
    /// allocated from 1 in the order requests succeed.
    fn into_event(self) -> Option<LedgerEvent> {
        match self.op.to_lowercase().as_str() {
            "accrue" => Some(LedgerEvent::Accrue {
                creator: CreatorId(self.creator?),
                campaign: CampaignId(self.campaign?),
                amount: self.amount?,
                source: self.source?.parse().ok()?,
            }),
            "request" => Some(LedgerEvent::Request {
                creator: CreatorId(self.creator?),
                amount: self.amount?,
                bank_details: self.detail.unwrap_or_default(),
            }),
            "process" => Some(LedgerEvent::Process {
                payout: PayoutId(self.payout?),
            }),
            "complete" => Some(LedgerEvent::Complete {
                payout: PayoutId(self.payout?),
            }),
            "fail" => Some(LedgerEvent::Fail {
                payout: PayoutId(self.payout?),
                reason: self.detail.unwrap_or_default(),
            }),
            _ => None,
        }
    }
}

/// Replays ledger events from a CSV reader.
///
/// Streaming parse, so arbitrarily large files never load fully into memory.
/// Malformed rows and rejected operations are skipped.
///
/// # CSV Format
///
/// Expected columns: `op, creator, campaign, amount, source, payout, detail`
/// - `op`: Event kind (accrue, request, process, complete, fail)
/// - `creator`: Creator id (accrue/request)
/// - `campaign`: Source campaign id (accrue)
/// - `amount`: Decimal amount (accrue/request)
/// - `source`: Revenue source tag (accrue: referral_bonus, campaign_success, tip_jar)
/// - `payout`: Payout id (process/complete/fail)
/// - `detail`: Bank details (request) or failure reason (fail)
///
/// # Example
///
/// ```csv
/// op,creator,campaign,amount,source,payout,detail
/// accrue,1,7,25.00,campaign_success,,
/// request,1,,25.00,,,iban:XX00
/// process,,,,,1,
/// complete,,,,,1,
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
/// Individual event errors are logged in debug mode but don't stop the replay.
pub fn replay_events<R: Read>(reader: R) -> Result<Ledger, csv::Error> {
    let ledger = Ledger::new();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => {
                let Some(event) = record.into_event() else {
                    #[cfg(debug_assertions)]
                    eprintln!("Skipping invalid event record");
                    continue;
                };

                let outcome = match event {
                    LedgerEvent::Accrue {
                        creator,
                        campaign,
                        amount,
                        source,
                    } => ledger.add_revenue(creator, amount, source, campaign).map(|_| ()),
                    LedgerEvent::Request {
                        creator,
                        amount,
                        bank_details,
                    } => ledger.request_payout(creator, amount, bank_details).map(|_| ()),
                    LedgerEvent::Process { payout } => ledger.start_payout_processing(payout),
                    LedgerEvent::Complete { payout } => ledger.complete_payout_request(payout),
                    LedgerEvent::Fail { payout, reason } => {
                        ledger.fail_payout_request(payout, &reason)
                    }
                };

                // Rejected operations don't stop the replay
                if let Err(e) = outcome {
                    #[cfg(debug_assertions)]
                    eprintln!("Skipping event: {}", e);
                    let _ = e;
                }
            }
            Err(e) => {
                #[cfg(debug_assertions)]
                eprintln!("Skipping malformed row: {}", e);
                let _ = e;
                continue;
            }
        }
    }

    Ok(ledger)
}

/// Writes account summaries to a CSV writer.
///
/// # CSV Format
///
/// Columns: `creator, total_earnings, referral_bonus, campaign_success_fees,
/// tip_jar_earnings, total_paid, total_pending, reserved, available_for_payout`,
/// money rounded to 2 decimal places.
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_summaries<W: Write>(ledger: &Ledger, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for account in ledger.accounts() {
        wtr.serialize(account.value())?;
    }

    wtr.flush()?;
    Ok(())
}
