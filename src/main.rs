use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use race_ledger::application::dispatcher::Dispatcher;
use race_ledger::application::mutator::BalanceMutator;
use race_ledger::application::recovery::{LogRecovery, ReapplyRecovery};
use race_ledger::config::EngineConfig;
use race_ledger::domain::account::{Account, AccountKey, Lookup};
use race_ledger::domain::ledger::LedgerStatus;
use race_ledger::domain::ports::{LedgerSinkRef, RecordStoreRef, RecoveryHookRef};
use race_ledger::domain::transaction::TransactionRequest;
use race_ledger::infrastructure::in_memory::{InMemoryLedgerSink, InMemoryRecordStore};
use race_ledger::interfaces::csv::report_writer::{AccountWriter, LedgerReportWriter};
use race_ledger::interfaces::csv::transaction_reader::TransactionReader;
use race_ledger::logging;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON configuration file. Flags below override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Attempts per transaction, including the first.
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    /// Fixed delay between attempts, in milliseconds.
    #[arg(long, global = true)]
    backoff_ms: Option<u64>,

    /// Upper bound of a random delay added to each backoff, in milliseconds.
    #[arg(long, global = true)]
    jitter_ms: Option<u64>,

    /// Timeout of a single ledger write, in milliseconds.
    #[arg(long, global = true)]
    ledger_timeout_ms: Option<u64>,

    /// Write every ledger entry to this CSV file once the run is over.
    #[arg(long, global = true)]
    ledger_csv: Option<PathBuf>,

    /// What to do with a transaction once its retries are exhausted.
    #[arg(long, global = true, value_enum, default_value_t = RecoveryMode::Log)]
    recovery: RecoveryMode,
}

#[derive(Subcommand)]
enum Command {
    /// Fire concurrent increments at a single account and report the result.
    Race {
        #[arg(long, default_value = "customer-1")]
        account: String,
        #[arg(long, default_value = "Isa Katirci")]
        holder: String,
        #[arg(long, default_value_t = 100)]
        count: usize,
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        amount: i64,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        initial_balance: i64,
    },
    /// Dispatch every row of an `account,amount,label` CSV concurrently.
    Replay {
        /// Input transactions CSV file
        input: PathBuf,
        /// Open an account with a zero balance unless it already exists.
        #[arg(long = "open")]
        open: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RecoveryMode {
    Log,
    Reapply,
}

fn build_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path).into_diagnostic()?,
        None => EngineConfig::default(),
    };
    if let Some(max_attempts) = cli.max_attempts {
        config.retry.max_attempts = max_attempts;
    }
    if let Some(backoff_ms) = cli.backoff_ms {
        config.retry.backoff_ms = backoff_ms;
    }
    if let Some(jitter_ms) = cli.jitter_ms {
        config.retry.jitter_ms = jitter_ms;
    }
    if let Some(timeout_ms) = cli.ledger_timeout_ms {
        config.ledger.timeout_ms = timeout_ms;
    }
    config.validate().into_diagnostic()?;
    Ok(config)
}

fn in_memory_storage() -> (RecordStoreRef, LedgerSinkRef) {
    let records: RecordStoreRef = Arc::new(InMemoryRecordStore::new());
    let ledger: LedgerSinkRef = Arc::new(InMemoryLedgerSink::new());
    (records, ledger)
}

#[cfg(feature = "storage-rocksdb")]
fn open_storage(db_path: Option<&PathBuf>) -> Result<(RecordStoreRef, LedgerSinkRef)> {
    use race_ledger::infrastructure::rocksdb::RocksDBStore;

    if let Some(path) = db_path {
        let store = RocksDBStore::open(path).into_diagnostic()?;
        let records: RecordStoreRef = Arc::new(store.clone());
        let ledger: LedgerSinkRef = Arc::new(store);
        return Ok((records, ledger));
    }
    Ok(in_memory_storage())
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_storage(db_path: Option<&PathBuf>) -> Result<(RecordStoreRef, LedgerSinkRef)> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_storage())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    let (store, ledger) = open_storage(cli.db_path.as_ref())?;
    let recovery: RecoveryHookRef = match cli.recovery {
        RecoveryMode::Log => Arc::new(LogRecovery),
        RecoveryMode::Reapply => Arc::new(ReapplyRecovery::new(store.clone())),
    };
    let mutator = Arc::new(BalanceMutator::new(
        store.clone(),
        ledger.clone(),
        recovery,
        &config,
    ));
    let dispatcher = Dispatcher::new(mutator, &config.dispatcher);

    match cli.command {
        Command::Race {
            account,
            holder,
            count,
            amount,
            initial_balance,
        } => {
            let key = AccountKey::new(account);
            store
                .insert(Account::new(key.clone(), holder, initial_balance))
                .await
                .into_diagnostic()?;

            let template = TransactionRequest::new(key.clone(), amount, "debit");
            let report = dispatcher
                .run_concurrent_batch(count, &template)
                .await
                .into_diagnostic()?;
            println!("{}", report);

            let entries = ledger.entries().await.into_diagnostic()?;
            for status in [
                LedgerStatus::Received,
                LedgerStatus::Orphaned,
                LedgerStatus::Corrupted,
                LedgerStatus::Failed,
            ] {
                let count = entries
                    .iter()
                    .filter(|e| e.status == status && e.account.as_ref() == Some(&key))
                    .count();
                println!("ledger {}={}", status, count);
            }
        }
        Command::Replay { input, open } => {
            for key in open {
                let key = AccountKey::new(key);
                if let Lookup::NotFound = store.get(&key).await.into_diagnostic()? {
                    let holder = key.to_string();
                    store
                        .insert(Account::new(key, holder, 0))
                        .await
                        .into_diagnostic()?;
                }
            }

            let file = File::open(input).into_diagnostic()?;
            let reader = TransactionReader::new(file);
            let mut requests = Vec::new();
            for request in reader.requests() {
                match request {
                    Ok(request) => requests.push(request),
                    Err(e) => eprintln!("Error reading transaction: {}", e),
                }
            }

            let report = dispatcher.run_batch(requests).await;
            eprintln!("{}", report);

            let accounts = store.all().await.into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = AccountWriter::new(stdout.lock());
            writer.write_accounts(&accounts).into_diagnostic()?;
        }
    }

    if let Some(path) = cli.ledger_csv {
        let entries = ledger.entries().await.into_diagnostic()?;
        let file = File::create(path).into_diagnostic()?;
        LedgerReportWriter::new(file)
            .write_entries(&entries)
            .into_diagnostic()?;
    }

    Ok(())
}
