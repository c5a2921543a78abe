use crate::application::mutator::BalanceMutator;
use crate::config::DispatcherConfig;
use crate::domain::account::Lookup;
use crate::domain::transaction::{Outcome, TransactionRequest};
use crate::error::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{error, info};

/// Aggregate of one batch, owned by the caller.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchReport {
    pub attempted: usize,
    pub applied: usize,
    pub corrupted: usize,
    pub orphaned: usize,
    pub failed: usize,
    /// Save attempts summed over all requests. Anything above `applied +
    /// failed` was spent on conflicts.
    pub attempts: u64,
    /// Workers whose call did not complete: panics, cancellations and
    /// workers still running when the barrier timed out.
    pub errors: usize,
    pub final_balance: Option<i64>,
    pub elapsed: Duration,
}

impl BatchReport {
    fn tally(&mut self, outcome: &Outcome) {
        self.attempts += u64::from(outcome.attempts());
        match outcome {
            Outcome::Applied { .. } => self.applied += 1,
            Outcome::Corrupted => self.corrupted += 1,
            Outcome::Orphaned => self.orphaned += 1,
            Outcome::Failed { .. } => self.failed += 1,
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempted={} applied={} corrupted={} orphaned={} failed={} attempts={} errors={} elapsed_ms={}",
            self.attempted,
            self.applied,
            self.corrupted,
            self.orphaned,
            self.failed,
            self.attempts,
            self.errors,
            self.elapsed.as_millis()
        )?;
        if let Some(balance) = self.final_balance {
            write!(f, " final_balance={}", balance)?;
        }
        Ok(())
    }
}

/// Fans requests out to concurrent workers against a shared mutator.
pub struct Dispatcher {
    mutator: Arc<BalanceMutator>,
    join_timeout: Duration,
}

impl Dispatcher {
    pub fn new(mutator: Arc<BalanceMutator>, config: &DispatcherConfig) -> Self {
        Self {
            mutator,
            join_timeout: config.join_timeout(),
        }
    }

    /// Runs `n` concurrent copies of `template`, then reads the target
    /// account's balance once every worker has finished.
    pub async fn run_concurrent_batch(
        &self,
        n: usize,
        template: &TransactionRequest,
    ) -> Result<BatchReport> {
        let requests = std::iter::repeat_n(template.clone(), n).collect();
        let mut report = self.run_batch(requests).await;

        if let Some(key) = &template.account {
            report.final_balance = match self.mutator.store().get(key).await? {
                Lookup::Found(account) => Some(account.balance),
                Lookup::NotFound => None,
            };
        }

        info!(%report, "batch finished");
        Ok(report)
    }

    /// Applies every request on its own task and waits for all of them.
    ///
    /// Workers still running when the barrier times out are aborted. Every
    /// worker that ends without an outcome gets a FAILED ledger entry.
    pub async fn run_batch(&self, requests: Vec<TransactionRequest>) -> BatchReport {
        let started = Instant::now();
        let mut report = BatchReport {
            attempted: requests.len(),
            ..BatchReport::default()
        };

        let mut workers = JoinSet::new();
        let mut pending: HashMap<Id, TransactionRequest> = HashMap::new();
        for request in requests {
            let mutator = Arc::clone(&self.mutator);
            let task_request = request.clone();
            let handle = workers.spawn(async move { mutator.apply(&task_request).await });
            pending.insert(handle.id(), request);
        }

        let barrier = async {
            while let Some(joined) = workers.join_next_with_id().await {
                self.settle(joined, &mut pending, &mut report).await;
            }
        };

        if tokio::time::timeout(self.join_timeout, barrier).await.is_err() {
            error!(
                pending = workers.len(),
                "batch barrier timed out, aborting remaining workers"
            );
            workers.abort_all();
            // Workers that finished before the abort still report their outcome.
            while let Some(joined) = workers.join_next_with_id().await {
                self.settle(joined, &mut pending, &mut report).await;
            }
        }

        report.elapsed = started.elapsed();
        report
    }

    async fn settle(
        &self,
        joined: std::result::Result<(Id, Outcome), JoinError>,
        pending: &mut HashMap<Id, TransactionRequest>,
        report: &mut BatchReport,
    ) {
        match joined {
            Ok((id, outcome)) => {
                pending.remove(&id);
                report.tally(&outcome);
            }
            Err(e) => {
                error!(error = %e, "transaction worker did not complete");
                report.errors += 1;
                if let Some(request) = pending.remove(&e.id()) {
                    self.mutator.abandon(&request).await;
                }
            }
        }
    }
}
