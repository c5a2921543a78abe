#![allow(dead_code)]

use async_trait::async_trait;
use race_ledger::application::mutator::BalanceMutator;
use race_ledger::config::EngineConfig;
use race_ledger::domain::account::{Account, AccountKey, Lookup};
use race_ledger::domain::ledger::{LedgerEntry, LedgerStatus};
use race_ledger::domain::ports::{
    LedgerSink, LedgerSinkRef, RecordStore, RecordStoreRef, RecoveryHook, RecoveryHookRef,
};
use race_ledger::domain::transaction::TransactionRequest;
use race_ledger::error::{BalanceError, Result};
use race_ledger::infrastructure::in_memory::InMemoryRecordStore;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const ACCOUNT: &str = "isa";

/// Retry settings under which `n` contenders can never exhaust their budget.
pub fn contention_config(n: usize) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.retry.max_attempts = n.max(1) as u32;
    config.retry.backoff_ms = 1;
    config.retry.max_elapsed_ms = None;
    config
}

pub async fn seeded_store(balance: i64) -> Arc<InMemoryRecordStore> {
    let store = Arc::new(InMemoryRecordStore::new());
    store
        .insert(Account::new(AccountKey::new(ACCOUNT), "Isa Katirci", balance))
        .await
        .unwrap();
    store
}

pub fn mutator(
    store: RecordStoreRef,
    sink: LedgerSinkRef,
    recovery: RecoveryHookRef,
    config: &EngineConfig,
) -> Arc<BalanceMutator> {
    Arc::new(BalanceMutator::new(store, sink, recovery, config))
}

pub async fn balance_of(store: &dyn RecordStore, key: &str) -> Option<i64> {
    match store.get(&AccountKey::new(key)).await.unwrap() {
        Lookup::Found(account) => Some(account.balance),
        Lookup::NotFound => None,
    }
}

pub fn count_status(entries: &[LedgerEntry], status: LedgerStatus) -> usize {
    entries.iter().filter(|e| e.status == status).count()
}

/// A store on which every save loses the race.
pub struct AlwaysConflictingStore {
    inner: InMemoryRecordStore,
    saves: AtomicUsize,
}

impl AlwaysConflictingStore {
    pub async fn seeded() -> Self {
        let inner = InMemoryRecordStore::new();
        inner
            .insert(Account::new(AccountKey::new(ACCOUNT), "Isa Katirci", 0))
            .await
            .unwrap();
        Self {
            inner,
            saves: AtomicUsize::new(0),
        }
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for AlwaysConflictingStore {
    async fn get(&self, key: &AccountKey) -> Result<Lookup> {
        self.inner.get(key).await
    }

    async fn save(&self, account: Account) -> Result<Account> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Err(BalanceError::Conflict(account.key))
    }

    async fn insert(&self, account: Account) -> Result<()> {
        self.inner.insert(account).await
    }

    async fn all(&self) -> Result<Vec<Account>> {
        self.inner.all().await
    }
}

/// A store whose saves hang for `delay`.
pub struct StalledSaveStore {
    inner: InMemoryRecordStore,
    delay: Duration,
}

impl StalledSaveStore {
    pub async fn seeded(delay: Duration) -> Self {
        let inner = InMemoryRecordStore::new();
        inner
            .insert(Account::new(AccountKey::new(ACCOUNT), "Isa Katirci", 0))
            .await
            .unwrap();
        Self { inner, delay }
    }
}

#[async_trait]
impl RecordStore for StalledSaveStore {
    async fn get(&self, key: &AccountKey) -> Result<Lookup> {
        self.inner.get(key).await
    }

    async fn save(&self, account: Account) -> Result<Account> {
        tokio::time::sleep(self.delay).await;
        self.inner.save(account).await
    }

    async fn insert(&self, account: Account) -> Result<()> {
        self.inner.insert(account).await
    }

    async fn all(&self) -> Result<Vec<Account>> {
        self.inner.all().await
    }
}

/// A ledger that rejects every append.
pub struct FailingLedgerSink {
    pub attempts: AtomicUsize,
}

impl FailingLedgerSink {
    pub fn new() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LedgerSink for FailingLedgerSink {
    async fn append(&self, _entry: LedgerEntry) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(BalanceError::Storage("ledger unavailable".to_string()))
    }

    async fn entries(&self) -> Result<Vec<LedgerEntry>> {
        Err(BalanceError::Storage("ledger unavailable".to_string()))
    }
}

/// A ledger whose appends never finish in time.
pub struct StalledLedgerSink {
    pub delay: Duration,
}

#[async_trait]
impl LedgerSink for StalledLedgerSink {
    async fn append(&self, _entry: LedgerEntry) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<LedgerEntry>> {
        Ok(Vec::new())
    }
}

/// Counts invocations and optionally fails every one of them.
pub struct CountingRecovery {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingRecovery {
    pub fn new(fail: bool) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecoveryHook for CountingRecovery {
    async fn recover(&self, _request: &TransactionRequest, error: &BalanceError) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BalanceError::Storage(format!("recovery failed after: {}", error)));
        }
        Ok(())
    }
}

pub fn generate_csv(path: &Path, rows: usize, account: &str) -> std::result::Result<(), Error> {
    let mut wtr = csv::WriterBuilder::new().from_path(path)?;
    wtr.write_record(["account", "amount", "label"])?;
    for i in 1..=rows {
        wtr.write_record([account, "1", &format!("debit-{}", i)])?;
    }
    wtr.flush()?;
    Ok(())
}
