use crate::config::LedgerConfig;
use crate::domain::ledger::{LedgerEntry, LedgerStatus};
use crate::domain::ports::LedgerSinkRef;
use crate::domain::transaction::TransactionRequest;
use crate::error::BalanceError;
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, warn};

/// Appends one audit row per classification of a request.
///
/// Every call is its own unit of work, bounded by a timeout, and never
/// fails towards the caller: a lost audit row must not abort or roll back
/// a balance mutation.
#[derive(Clone)]
pub struct LedgerWriter {
    sink: LedgerSinkRef,
    timeout: Duration,
}

impl LedgerWriter {
    pub fn new(sink: LedgerSinkRef, config: &LedgerConfig) -> Self {
        Self {
            sink,
            timeout: config.timeout(),
        }
    }

    pub async fn record(&self, request: &TransactionRequest, status: LedgerStatus) {
        let entry = LedgerEntry {
            account: request.account.clone(),
            amount: request.amount,
            status,
            created: Utc::now(),
        };

        let result = match tokio::time::timeout(self.timeout, self.sink.append(entry)).await {
            Ok(result) => result,
            Err(_) => Err(BalanceError::LedgerTimeout(self.timeout.as_millis() as u64)),
        };

        match result {
            Ok(()) => debug!(account = ?request.account, %status, "ledger entry recorded"),
            Err(e) => warn!(
                account = ?request.account,
                amount = request.amount,
                %status,
                error = %e,
                "failed to save ledger entry"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::LedgerSink;
    use crate::error::Result;
    use crate::infrastructure::in_memory::InMemoryLedgerSink;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct BrokenSink;

    #[async_trait]
    impl LedgerSink for BrokenSink {
        async fn append(&self, _entry: LedgerEntry) -> Result<()> {
            Err(BalanceError::Storage("ledger table is locked".to_string()))
        }

        async fn entries(&self) -> Result<Vec<LedgerEntry>> {
            Ok(Vec::new())
        }
    }

    struct StalledSink;

    #[async_trait]
    impl LedgerSink for StalledSink {
        async fn append(&self, _entry: LedgerEntry) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }

        async fn entries(&self) -> Result<Vec<LedgerEntry>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_record_appends_entry() {
        let sink = Arc::new(InMemoryLedgerSink::new());
        let writer = LedgerWriter::new(sink.clone(), &LedgerConfig::default());
        let request = TransactionRequest::new("isa", 3, "debit");

        writer.record(&request, LedgerStatus::Received).await;

        let entries = sink.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].account, request.account);
        assert_eq!(entries[0].amount, 3);
        assert_eq!(entries[0].status, LedgerStatus::Received);
    }

    #[tokio::test]
    async fn test_record_swallows_sink_errors() {
        let writer = LedgerWriter::new(Arc::new(BrokenSink), &LedgerConfig::default());
        writer
            .record(&TransactionRequest::unaddressed(1, "x"), LedgerStatus::Corrupted)
            .await;
    }

    #[tokio::test]
    async fn test_record_gives_up_after_timeout() {
        let writer = LedgerWriter::new(Arc::new(StalledSink), &LedgerConfig { timeout_ms: 50 });
        let started = std::time::Instant::now();
        writer
            .record(&TransactionRequest::new("isa", 1, "x"), LedgerStatus::Received)
            .await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
