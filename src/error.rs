use crate::domain::account::AccountKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BalanceError {
    /// Another writer committed to the account between our read and our save.
    #[error("Concurrent update conflict on account {0}")]
    Conflict(AccountKey),
    #[error("Account not found: {0}")]
    NotFound(AccountKey),
    #[error("Balance overflow on account {0}")]
    Overflow(AccountKey),
    #[error("Ledger write timed out after {0}ms")]
    LedgerTimeout(u64),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl BalanceError {
    /// The only condition the mutator retries on.
    pub fn is_conflict(&self) -> bool {
        matches!(self, BalanceError::Conflict(_))
    }
}

pub type Result<T> = std::result::Result<T, BalanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflict_is_retryable() {
        let key = AccountKey::new("acc-1");
        assert!(BalanceError::Conflict(key.clone()).is_conflict());
        assert!(!BalanceError::NotFound(key.clone()).is_conflict());
        assert!(!BalanceError::Overflow(key).is_conflict());
        assert!(!BalanceError::Storage("disk full".to_string()).is_conflict());
        assert!(!BalanceError::LedgerTimeout(1000).is_conflict());
    }
}
