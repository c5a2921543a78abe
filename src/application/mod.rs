//! Application layer containing the concurrent balance-mutation core.
//!
//! `BalanceMutator` applies one request under optimistic concurrency with a
//! bounded retry loop, `LedgerWriter` audits every classification on its
//! own commit boundary, and `Dispatcher` fans requests out to concurrent
//! tokio tasks and aggregates their outcomes.

pub mod dispatcher;
pub mod ledger;
pub mod mutator;
pub mod recovery;
