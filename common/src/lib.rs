//! zkBank Common Types
//!
//! This crate contains shared types used across the zkBank workflow,
//! including identifiers, the transaction record with its status state
//! machine, request shapes and the error taxonomy.

pub mod identifiers;
pub mod transaction;
pub mod error;
pub mod time;

pub use identifiers::*;
pub use transaction::*;
pub use error::*;
pub use time::*;
