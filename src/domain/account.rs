use crate::error::{BalanceError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountKey(String);

impl AccountKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// The single mutable balance of a customer.
///
/// `version` is the optimistic concurrency stamp: a store only accepts a
/// save whose version matches the one it currently holds, and advances it
/// on every successful save. Timestamps are informational only.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub key: AccountKey,
    /// Human-readable name of the account holder.
    pub holder: String,
    /// Current balance. May be negative.
    pub balance: i64,
    pub version: u64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Account {
    pub fn new(key: AccountKey, holder: impl Into<String>, balance: i64) -> Self {
        let now = Utc::now();
        Self {
            key,
            holder: holder.into(),
            balance,
            version: 0,
            created: now,
            updated: now,
        }
    }

    /// Returns the account with `amount` added to its balance.
    ///
    /// The version is left untouched: the store compares it against the
    /// stored one on save.
    pub fn with_delta(&self, amount: i64, now: DateTime<Utc>) -> Result<Self> {
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| BalanceError::Overflow(self.key.clone()))?;
        Ok(Self {
            balance,
            updated: now,
            ..self.clone()
        })
    }
}

/// Result of resolving an account by key.
#[derive(Debug, PartialEq, Clone)]
pub enum Lookup {
    Found(Account),
    NotFound,
}

impl Lookup {
    pub fn into_option(self) -> Option<Account> {
        match self {
            Lookup::Found(account) => Some(account),
            Lookup::NotFound => None,
        }
    }
}

impl From<Option<Account>> for Lookup {
    fn from(account: Option<Account>) -> Self {
        match account {
            Some(account) => Lookup::Found(account),
            None => Lookup::NotFound,
        }
    }
}
