//! Domain types and the ports the core talks to.

pub mod account;
pub mod ledger;
pub mod ports;
pub mod transaction;
