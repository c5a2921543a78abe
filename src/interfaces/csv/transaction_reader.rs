use crate::domain::transaction::TransactionRequest;
use crate::error::{BalanceError, Result};
use std::io::Read;

/// Reads transaction requests from a CSV source with an
/// `account,amount,label` header.
///
/// An empty `account` field yields a request without a key; such rows are
/// dispatched like any other and end up CORRUPTED in the ledger.
pub struct TransactionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> TransactionReader<R> {
    /// Creates a new `TransactionReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes requests.
    pub fn requests(self) -> impl Iterator<Item = Result<TransactionRequest>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(BalanceError::from))
    }
}
