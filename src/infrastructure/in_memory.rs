use crate::domain::account::{Account, AccountKey, Lookup};
use crate::domain::ledger::LedgerEntry;
use crate::domain::ports::{LedgerSink, RecordStore};
use crate::error::{BalanceError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory account store with version-stamped saves.
///
/// The write lock is held only for the compare-and-swap inside `save`,
/// never across a caller's read-modify-write. `save` suspends once before
/// taking the lock, so concurrent writers that read the same version
/// interleave and collide the way they would against a remote backend.
#[derive(Default, Clone)]
pub struct InMemoryRecordStore {
    accounts: Arc<RwLock<HashMap<AccountKey, Account>>>,
}

impl InMemoryRecordStore {
    /// Creates a new, empty in-memory account store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, key: &AccountKey) -> Result<Lookup> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(key).cloned().into())
    }

    async fn save(&self, mut account: Account) -> Result<Account> {
        tokio::task::yield_now().await;
        let mut accounts = self.accounts.write().await;
        let stored = accounts
            .get_mut(&account.key)
            .ok_or_else(|| BalanceError::NotFound(account.key.clone()))?;

        if stored.version != account.version {
            return Err(BalanceError::Conflict(account.key));
        }

        account.version += 1;
        *stored = account.clone();
        Ok(account)
    }

    async fn insert(&self, mut account: Account) -> Result<()> {
        account.version = 0;
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.key.clone(), account);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Account>> {
        let accounts = self.accounts.read().await;
        let mut all: Vec<Account> = accounts.values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(all)
    }
}

/// A thread-safe in-memory append-only ledger.
#[derive(Default, Clone)]
pub struct InMemoryLedgerSink {
    entries: Arc<RwLock<Vec<LedgerEntry>>>,
}

impl InMemoryLedgerSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerSink for InMemoryLedgerSink {
    async fn append(&self, entry: LedgerEntry) -> Result<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self.entries.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::LedgerStatus;
    use chrono::Utc;

    #[tokio::test]
    async fn test_in_memory_record_store() {
        let store = InMemoryRecordStore::new();
        let account = Account::new(AccountKey::new("isa"), "Isa K", 100);

        store.insert(account.clone()).await.unwrap();
        let retrieved = store.get(&AccountKey::new("isa")).await.unwrap();
        assert_eq!(retrieved, Lookup::Found(account));

        assert_eq!(
            store.get(&AccountKey::new("ghost")).await.unwrap(),
            Lookup::NotFound
        );
    }

    #[tokio::test]
    async fn test_save_advances_version() {
        let store = InMemoryRecordStore::new();
        store
            .insert(Account::new(AccountKey::new("isa"), "Isa K", 0))
            .await
            .unwrap();

        let read = store.get(&AccountKey::new("isa")).await.unwrap().into_option().unwrap();
        let saved = store.save(read.with_delta(1, Utc::now()).unwrap()).await.unwrap();
        assert_eq!(saved.version, 1);
        assert_eq!(saved.balance, 1);
    }

    #[tokio::test]
    async fn test_stale_save_is_a_conflict() {
        let store = InMemoryRecordStore::new();
        store
            .insert(Account::new(AccountKey::new("isa"), "Isa K", 0))
            .await
            .unwrap();

        let first = store.get(&AccountKey::new("isa")).await.unwrap().into_option().unwrap();
        let second = first.clone();

        store.save(first.with_delta(1, Utc::now()).unwrap()).await.unwrap();
        let stale = store.save(second.with_delta(1, Utc::now()).unwrap()).await;
        assert!(matches!(stale, Err(ref e) if e.is_conflict()));

        let current = store.get(&AccountKey::new("isa")).await.unwrap().into_option().unwrap();
        assert_eq!(current.balance, 1);
    }

    #[tokio::test]
    async fn test_save_unknown_account() {
        let store = InMemoryRecordStore::new();
        let result = store
            .save(Account::new(AccountKey::new("ghost"), "Nobody", 1))
            .await;
        assert!(matches!(result, Err(BalanceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_insert_resets_existing_account() {
        let store = InMemoryRecordStore::new();
        let mut account = Account::new(AccountKey::new("isa"), "Isa K", 50);
        account.version = 9;
        store.insert(account).await.unwrap();
        store
            .insert(Account::new(AccountKey::new("isa"), "Isa K", 0))
            .await
            .unwrap();

        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].balance, 0);
        assert_eq!(all[0].version, 0);
    }

    #[tokio::test]
    async fn test_in_memory_ledger_sink() {
        let sink = InMemoryLedgerSink::new();
        let entry = LedgerEntry {
            account: Some(AccountKey::new("isa")),
            amount: 1,
            status: LedgerStatus::Received,
            created: Utc::now(),
        };

        sink.append(entry.clone()).await.unwrap();
        sink.append(entry.clone()).await.unwrap();

        let entries = sink.entries().await.unwrap();
        assert_eq!(entries, vec![entry.clone(), entry]);
    }
}
