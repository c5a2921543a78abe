use crate::application::ledger::LedgerWriter;
use crate::config::{EngineConfig, RetryPolicy};
use crate::domain::account::{Account, AccountKey, Lookup};
use crate::domain::ledger::LedgerStatus;
use crate::domain::ports::{LedgerSinkRef, RecordStoreRef, RecoveryHookRef};
use crate::domain::transaction::{Outcome, TransactionRequest};
use crate::error::{BalanceError, Result};
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// A request the retry loop gave up on.
struct Terminal {
    attempts: u32,
    error: BalanceError,
}

/// Applies balance deltas under optimistic concurrency control.
///
/// Each attempt is an independent read-modify-write committed through
/// [`RecordStore::save`](crate::domain::ports::RecordStore::save), which
/// rejects the write with `BalanceError::Conflict` when another writer
/// committed since the read. Conflicts are retried with a fixed backoff;
/// anything else, and an exhausted budget, ends in the recovery hook.
/// No lock is held across attempts.
pub struct BalanceMutator {
    store: RecordStoreRef,
    ledger: LedgerWriter,
    recovery: RecoveryHookRef,
    policy: RetryPolicy,
}

impl BalanceMutator {
    pub fn new(
        store: RecordStoreRef,
        ledger_sink: LedgerSinkRef,
        recovery: RecoveryHookRef,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            ledger: LedgerWriter::new(ledger_sink, &config.ledger),
            recovery,
            policy: config.retry.clone(),
        }
    }

    pub fn store(&self) -> &RecordStoreRef {
        &self.store
    }

    /// Validates, classifies and applies a single request.
    ///
    /// Never fails: every error is classified into the returned outcome and
    /// into the ledger.
    pub async fn apply(&self, request: &TransactionRequest) -> Outcome {
        let Some(key) = request.account.as_ref() else {
            error!(label = %request.label, "transaction has no account key");
            self.ledger.record(request, LedgerStatus::Corrupted).await;
            return Outcome::Corrupted;
        };

        let account = match self.store.get(key).await {
            Ok(Lookup::Found(account)) => account,
            Ok(Lookup::NotFound) => {
                error!(account = %key, "account not found");
                self.ledger.record(request, LedgerStatus::Orphaned).await;
                return Outcome::Orphaned;
            }
            Err(e) => {
                return self
                    .give_up(request, Terminal { attempts: 0, error: e })
                    .await;
            }
        };

        self.ledger.record(request, LedgerStatus::Received).await;

        match self.apply_with_retry(key, request.amount, account).await {
            Ok((saved, attempts)) => {
                info!(
                    account = %key,
                    holder = %saved.holder,
                    amount = request.amount,
                    balance = saved.balance,
                    attempts,
                    "account balance changed"
                );
                Outcome::Applied {
                    balance: saved.balance,
                    attempts,
                }
            }
            Err(terminal) => self.give_up(request, terminal).await,
        }
    }

    /// Closes the ledger trail of a request whose worker was cancelled or
    /// panicked before producing an outcome.
    /// The recovery hook is not invoked.
    pub async fn abandon(&self, request: &TransactionRequest) {
        error!(account = ?request.account, amount = request.amount, "transaction abandoned");
        self.ledger.record(request, LedgerStatus::Failed).await;
    }

    async fn apply_with_retry(
        &self,
        key: &AccountKey,
        amount: i64,
        first_read: Account,
    ) -> std::result::Result<(Account, u32), Terminal> {
        let started = Instant::now();
        let mut snapshot = Some(first_read);
        let mut attempts = 0;

        loop {
            attempts += 1;
            let result = match snapshot.take() {
                Some(account) => self.commit_delta(account, amount).await,
                None => self.read_and_commit(key, amount).await,
            };

            let error = match result {
                Ok(saved) => return Ok((saved, attempts)),
                Err(e) if e.is_conflict() => e,
                Err(e) => return Err(Terminal { attempts, error: e }),
            };

            if attempts >= self.policy.max_attempts {
                warn!(account = %key, attempts, "retry attempts exhausted");
                return Err(Terminal { attempts, error });
            }

            let delay = self.policy.backoff();
            if let Some(budget) = self.policy.max_elapsed()
                && started.elapsed() + delay > budget
            {
                warn!(account = %key, attempts, "retry time budget exhausted");
                return Err(Terminal { attempts, error });
            }

            debug!(account = %key, attempts, delay_ms = delay.as_millis() as u64, "conflict, retrying");
            tokio::time::sleep(delay).await;
        }
    }

    async fn read_and_commit(&self, key: &AccountKey, amount: i64) -> Result<Account> {
        match self.store.get(key).await? {
            Lookup::Found(account) => self.commit_delta(account, amount).await,
            Lookup::NotFound => Err(BalanceError::NotFound(key.clone())),
        }
    }

    async fn commit_delta(&self, account: Account, amount: i64) -> Result<Account> {
        let next = account.with_delta(amount, Utc::now())?;
        self.store.save(next).await
    }

    async fn give_up(&self, request: &TransactionRequest, terminal: Terminal) -> Outcome {
        error!(
            account = ?request.account,
            amount = request.amount,
            attempts = terminal.attempts,
            error = %terminal.error,
            "giving up on transaction"
        );
        self.ledger.record(request, LedgerStatus::Failed).await;

        if let Err(e) = self.recovery.recover(request, &terminal.error).await {
            warn!(account = ?request.account, error = %e, "recovery hook failed");
        }

        Outcome::Failed {
            attempts: terminal.attempts,
            reason: terminal.error.to_string(),
        }
    }
}
