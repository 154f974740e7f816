//! zkBank Transaction Ledger
//!
//! Holds transaction records keyed by identifier and enforces the signing,
//! notarization and completion workflow over them.

pub mod engine;
pub mod config;
pub mod store;

pub use engine::TransactionLedger;
pub use config::LedgerConfig;
pub use store::{InMemoryStore, TransactionStore};
