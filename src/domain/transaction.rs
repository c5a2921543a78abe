use super::account::AccountKey;
use serde::{Deserialize, Serialize};

/// A request to add `amount` to the balance of `account`.
///
/// A missing `account` marks the request as malformed. Any amount,
/// including zero and negative values, is accepted.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TransactionRequest {
    pub account: Option<AccountKey>,
    pub amount: i64,
    #[serde(default)]
    pub label: String,
}

impl TransactionRequest {
    pub fn new(account: impl Into<AccountKey>, amount: i64, label: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            amount,
            label: label.into(),
        }
    }

    /// A request with no target account.
    pub fn unaddressed(amount: i64, label: impl Into<String>) -> Self {
        Self {
            account: None,
            amount,
            label: label.into(),
        }
    }
}

/// Outcome of a single `apply` call as seen by the caller.
#[derive(Debug, PartialEq, Clone)]
pub enum Outcome {
    /// The delta is reflected in the balance.
    Applied { balance: i64, attempts: u32 },
    /// Rejected at validation: no account key.
    Corrupted,
    /// Rejected at lookup: the account does not exist.
    Orphaned,
    /// Retries exhausted or a non-retryable error; recovery already ran.
    Failed { attempts: u32, reason: String },
}

impl Outcome {
    /// Save attempts spent on the request. Requests rejected before the
    /// first save report zero.
    pub fn attempts(&self) -> u32 {
        match self {
            Outcome::Applied { attempts, .. } | Outcome::Failed { attempts, .. } => *attempts,
            Outcome::Corrupted | Outcome::Orphaned => 0,
        }
    }
}
