//! zkBank API Server
//!
//! HTTP boundary over the transaction ledger. Clients create transactions,
//! collect signer approvals and a notary signature, and complete them.

pub mod api;
pub mod config;
pub mod metrics;
pub mod server;
pub mod state;

pub use api::{build_router, AppState};
pub use config::{LogFormat, ServerConfig};
pub use server::Server;
pub use state::ServerState;
