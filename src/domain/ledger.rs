use super::account::AccountKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedgerStatus {
    /// Written before the guarded mutation is attempted.
    Received,
    /// The target account does not exist.
    Orphaned,
    /// The request carried no account key.
    Corrupted,
    /// The mutation was given up after retries or a fatal error.
    Failed,
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            LedgerStatus::Received => "RECEIVED",
            LedgerStatus::Orphaned => "ORPHANED",
            LedgerStatus::Corrupted => "CORRUPTED",
            LedgerStatus::Failed => "FAILED",
        };
        f.write_str(tag)
    }
}

/// One append-only audit row.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct LedgerEntry {
    pub account: Option<AccountKey>,
    pub amount: i64,
    pub status: LedgerStatus,
    pub created: DateTime<Utc>,
}
