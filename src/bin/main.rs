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
use crossbeam::channel::{self, Sender};
use csv::{ReaderBuilder, Trim, Writer};
use point_ledger::{Ledger, LedgerConfig, PointError, ReclaimPolicy, TransactionKind, UserId};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Point Ledger - Replay point mutation CSV files
///
/// Reads charge/use mutations from a CSV file, applies them to an in-memory
/// ledger and writes the resulting balances (or histories) to stdout.
#[derive(Parser, Debug)]
#[command(name = "point-ledger")]
#[command(about = "Replays point mutation CSVs through the ledger", long_about = None)]
struct Args {
    /// Path to CSV file with mutations
    ///
    /// Expected format: type,user,amount
    /// Example: cargo run -- mutations.csv > balances.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Number of worker threads; rows are partitioned by user
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    workers: u16,

    /// Write every user's transaction history instead of balances
    #[arg(long)]
    history: bool,

    /// Keep user locks after use instead of reclaiming them
    #[arg(long)]
    no_reclaim: bool,
}

fn main() {
    init_tracing();
    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let reclaim = if args.no_reclaim {
        ReclaimPolicy::Retain
    } else {
        ReclaimPolicy::Reclaim
    };
    let config = LedgerConfig::new().reclaim(reclaim);

    let ledger = match process_mutations(BufReader::new(file), config, args.workers as usize) {
        Ok(ledger) => ledger,
        Err(e) => {
            eprintln!("Error processing mutations: {}", e);
            process::exit(1);
        }
    };
    info!(
        users = ledger.balance_store().len(),
        records = ledger.history_store().len(),
        "replay finished"
    );

    let written = if args.history {
        write_history(&ledger, std::io::stdout())
    } else {
        write_balances(&ledger, std::io::stdout())
    };
    if let Err(e) = written {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr so stdout stays valid CSV. Filter with `RUST_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug, Error)]
enum ReplayError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("a replay worker panicked")]
    WorkerPanicked,
}

/// Raw CSV record matching the input format.
///
/// Fields: `type, user, amount`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    kind: String,
    user: u64,
    amount: i64,
}

/// A parsed row, ready for the ledger.
#[derive(Debug, Clone, Copy)]
struct Mutation {
    user_id: UserId,
    amount: i64,
    kind: TransactionKind,
}

impl CsvRecord {
    fn into_mutation(self) -> Result<Mutation, PointError> {
        Ok(Mutation {
            user_id: UserId(self.user),
            amount: self.amount,
            kind: self.kind.parse()?,
        })
    }
}

/// Replays mutations from a CSV reader.
///
/// Rows are dispatched to `workers` threads by `user % workers`, so every
/// user's rows are applied in file order while different users proceed in
/// parallel. Malformed rows and rejected mutations are logged and skipped.
///
/// # CSV Format
///
/// Expected columns: `type, user, amount`
/// - `type`: `charge` or `use`
/// - `user`: User ID (u64)
/// - `amount`: Integer amount of points
///
/// ```csv
/// type,user,amount
/// charge,1,1000
/// use,1,500
/// ```
///
/// # Errors
///
/// Returns an error if the header cannot be read or a worker panics.
fn process_mutations<R: Read>(
    reader: R,
    config: LedgerConfig,
    workers: usize,
) -> Result<Ledger, ReplayError> {
    let ledger = Ledger::with_config(config);
    let workers = workers.max(1);

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(reader);
    rdr.headers()?;

    let shared = &ledger;
    crossbeam::scope(|scope| {
        let senders: Vec<Sender<Mutation>> = (0..workers)
            .map(|_| {
                let (tx, rx) = channel::unbounded::<Mutation>();
                scope.spawn(move |_| {
                    for m in rx {
                        if let Err(e) = shared.mutate(m.user_id, m.amount, m.kind) {
                            debug!(
                                user = %m.user_id,
                                amount = m.amount,
                                kind = %m.kind,
                                error = %e,
                                "skipping mutation"
                            );
                        }
                    }
                });
                tx
            })
            .collect();

        for (row, result) in rdr.deserialize::<CsvRecord>().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    debug!(row, error = %e, "skipping malformed row");
                    continue;
                }
            };
            let mutation = match record.into_mutation() {
                Ok(mutation) => mutation,
                Err(e) => {
                    debug!(row, error = %e, "skipping invalid row");
                    continue;
                }
            };

            let worker = (mutation.user_id.0 % workers as u64) as usize;
            if senders[worker].send(mutation).is_err() {
                // The worker is gone; the scope reports its panic.
                break;
            }
        }
        // Closing the channels lets the workers drain and exit.
        drop(senders);
    })
    .map_err(|_| ReplayError::WorkerPanicked)?;

    Ok(ledger)
}

/// Writes every balance as CSV, ordered by user.
///
/// Columns: `user_id, amount, updated_at`
fn write_balances<W: Write>(ledger: &Ledger, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    let mut balances = ledger.balance_store().all();
    balances.sort_by_key(|balance| balance.user_id);
    for balance in &balances {
        wtr.serialize(balance)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes every user's history as CSV, ordered by user then append order.
///
/// Columns: `id, user_id, amount, kind, timestamp`
fn write_history<W: Write>(ledger: &Ledger, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    let mut users: Vec<UserId> = ledger
        .balance_store()
        .all()
        .into_iter()
        .map(|balance| balance.user_id)
        .collect();
    users.sort();
    for user_id in users {
        for record in ledger.history(user_id) {
            wtr.serialize(record)?;
        }
    }

    wtr.flush()?;
    Ok(())
}
