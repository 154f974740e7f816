//! zkBank API Client
//!
//! Typed async access to the transaction workflow API: create a
//! transaction, gather signer approvals and a notary signature, complete it.

pub mod client;
pub mod config;

pub use client::{ApiClient, HealthStatus};
pub use config::ClientConfig;
