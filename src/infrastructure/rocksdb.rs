use crate::domain::account::{Account, AccountKey, Lookup};
use crate::domain::ledger::LedgerEntry;
use crate::domain::ports::{LedgerSink, RecordStore};
use crate::error::{BalanceError, Result};
use async_trait::async_trait;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, ErrorKind, IteratorMode, OptimisticTransactionDB,
    Options,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Column Family for storing account records.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for the append-only ledger.
pub const CF_LEDGER: &str = "ledger";

/// A persistent store implementation using an optimistic-transaction RocksDB.
///
/// Accounts and ledger entries live in separate Column Families. Account
/// saves run inside an optimistic transaction that re-reads the stored
/// version; a version mismatch or a commit rejected by RocksDB's own
/// conflict check surfaces as `BalanceError::Conflict`. Ledger appends are
/// plain writes outside any account transaction.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<OptimisticTransactionDB>,
    ledger_seq: Arc<AtomicU64>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("accounts" and "ledger")
    /// exist and resumes the ledger sequence after the last stored entry.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_accounts = ColumnFamilyDescriptor::new(CF_ACCOUNTS, Options::default());
        let cf_ledger = ColumnFamilyDescriptor::new(CF_LEDGER, Options::default());

        let db: OptimisticTransactionDB =
            OptimisticTransactionDB::open_cf_descriptors(&opts, path, vec![cf_accounts, cf_ledger])?;

        let next_seq = {
            let cf = db
                .cf_handle(CF_LEDGER)
                .ok_or_else(|| missing_cf(CF_LEDGER))?;
            let last = db.iterator_cf(cf, IteratorMode::End).next();
            match last {
                Some(item) => {
                    let (key, _) = item?;
                    decode_seq(&key)? + 1
                }
                None => 0,
            }
        };

        Ok(Self {
            db: Arc::new(db),
            ledger_seq: Arc::new(AtomicU64::new(next_seq)),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| missing_cf(name))
    }
}

fn missing_cf(name: &str) -> BalanceError {
    BalanceError::Storage(format!("{} column family not found", name))
}

fn decode_seq(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| BalanceError::Storage("malformed ledger key".to_string()))?;
    Ok(u64::from_be_bytes(bytes))
}

#[async_trait]
impl RecordStore for RocksDBStore {
    async fn get(&self, key: &AccountKey) -> Result<Lookup> {
        let cf = self.cf(CF_ACCOUNTS)?;
        match self.db.get_cf(cf, key.as_str().as_bytes())? {
            Some(bytes) => Ok(Lookup::Found(serde_json::from_slice(&bytes)?)),
            None => Ok(Lookup::NotFound),
        }
    }

    async fn save(&self, mut account: Account) -> Result<Account> {
        let cf = self.cf(CF_ACCOUNTS)?;
        let key = account.key.as_str().as_bytes().to_vec();

        let txn = self.db.transaction();
        let stored: Account = match txn.get_for_update_cf(cf, &key, true)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => return Err(BalanceError::NotFound(account.key)),
        };
        if stored.version != account.version {
            return Err(BalanceError::Conflict(account.key));
        }

        account.version += 1;
        txn.put_cf(cf, &key, serde_json::to_vec(&account)?)?;

        match txn.commit() {
            Ok(()) => Ok(account),
            Err(e) if matches!(e.kind(), ErrorKind::Busy | ErrorKind::TryAgain) => {
                Err(BalanceError::Conflict(account.key))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn insert(&self, mut account: Account) -> Result<()> {
        let cf = self.cf(CF_ACCOUNTS)?;
        account.version = 0;
        self.db.put_cf(
            cf,
            account.key.as_str().as_bytes(),
            serde_json::to_vec(&account)?,
        )?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Account>> {
        let cf = self.cf(CF_ACCOUNTS)?;
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            accounts.push(serde_json::from_slice(&value)?);
        }
        Ok(accounts)
    }
}

#[async_trait]
impl LedgerSink for RocksDBStore {
    async fn append(&self, entry: LedgerEntry) -> Result<()> {
        let cf = self.cf(CF_LEDGER)?;
        let seq = self.ledger_seq.fetch_add(1, Ordering::SeqCst);
        self.db
            .put_cf(cf, seq.to_be_bytes(), serde_json::to_vec(&entry)?)?;
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<LedgerEntry>> {
        let cf = self.cf(CF_LEDGER)?;
        let mut entries = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            entries.push(serde_json::from_slice(&value)?);
        }
        Ok(entries)
    }
}
