use super::account::{Account, AccountKey, Lookup};
use super::ledger::LedgerEntry;
use super::transaction::TransactionRequest;
use crate::error::{BalanceError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Keyed storage of accounts with a guarded save.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, key: &AccountKey) -> Result<Lookup>;

    /// Commits `account` only if its `version` still matches the stored one.
    ///
    /// Returns the stored account with its advanced version, or
    /// `BalanceError::Conflict` when another writer got there first.
    async fn save(&self, account: Account) -> Result<Account>;

    /// Creates or replaces an account unconditionally, resetting its version.
    async fn insert(&self, account: Account) -> Result<()>;

    async fn all(&self) -> Result<Vec<Account>>;
}

/// Append-only destination for ledger entries.
#[async_trait]
pub trait LedgerSink: Send + Sync {
    async fn append(&self, entry: LedgerEntry) -> Result<()>;
    async fn entries(&self) -> Result<Vec<LedgerEntry>>;
}

/// Invoked once for every request the mutator gives up on.
#[async_trait]
pub trait RecoveryHook: Send + Sync {
    async fn recover(&self, request: &TransactionRequest, error: &BalanceError) -> Result<()>;
}

pub type RecordStoreRef = Arc<dyn RecordStore>;
pub type LedgerSinkRef = Arc<dyn LedgerSink>;
pub type RecoveryHookRef = Arc<dyn RecoveryHook>;
