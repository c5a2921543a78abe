use crate::domain::account::Account;
use crate::domain::ledger::LedgerEntry;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct AccountRow<'a> {
    key: &'a str,
    holder: &'a str,
    balance: i64,
    version: u64,
}

/// Writes account snapshots as `key,holder,balance,version` rows.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_accounts(&mut self, accounts: &[Account]) -> Result<()> {
        for account in accounts {
            self.writer.serialize(AccountRow {
                key: account.key.as_str(),
                holder: &account.holder,
                balance: account.balance,
                version: account.version,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct LedgerRow<'a> {
    account: Option<&'a str>,
    amount: i64,
    status: String,
    created: String,
}

/// Writes ledger entries as `account,amount,status,created` rows.
pub struct LedgerReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LedgerReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_entries(&mut self, entries: &[LedgerEntry]) -> Result<()> {
        for entry in entries {
            self.writer.serialize(LedgerRow {
                account: entry.account.as_ref().map(|key| key.as_str()),
                amount: entry.amount,
                status: entry.status.to_string(),
                created: entry.created.to_rfc3339(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
