//! Terminal handlers for requests the mutator gave up on.
//!
//! The mutator calls the hook exactly once per failed request and discards
//! its result, so a hook may fail without affecting the caller.

use crate::domain::account::Lookup;
use crate::domain::ports::{RecordStoreRef, RecoveryHook};
use crate::domain::transaction::TransactionRequest;
use crate::error::{BalanceError, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

/// Reports the terminal error and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRecovery;

#[async_trait]
impl RecoveryHook for LogRecovery {
    async fn recover(&self, request: &TransactionRequest, error: &BalanceError) -> Result<()> {
        warn!(
            account = ?request.account,
            amount = request.amount,
            label = %request.label,
            error = %error,
            "transaction dropped after recovery"
        );
        Ok(())
    }
}

/// Makes one more guarded application attempt, without retrying.
///
/// The mutator has already written FAILED for the request when this runs,
/// so a successful reapply leaves a balance that includes the delta while
/// the request's last ledger row still reads FAILED.
///
/// A conflict on this attempt is returned as an error like any other; it
/// never re-enters the mutator's retry loop.
pub struct ReapplyRecovery {
    store: RecordStoreRef,
}

impl ReapplyRecovery {
    pub fn new(store: RecordStoreRef) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RecoveryHook for ReapplyRecovery {
    async fn recover(&self, request: &TransactionRequest, error: &BalanceError) -> Result<()> {
        let key = request
            .account
            .as_ref()
            .ok_or_else(|| BalanceError::Internal("recovery of a request without key".into()))?;

        warn!(account = %key, error = %error, "reapplying transaction once");
        let account = match self.store.get(key).await? {
            Lookup::Found(account) => account,
            Lookup::NotFound => return Err(BalanceError::NotFound(key.clone())),
        };
        let saved = self
            .store
            .save(account.with_delta(request.amount, Utc::now())?)
            .await?;
        info!(account = %key, balance = saved.balance, "transaction recovered");
        Ok(())
    }
}
