//! zkBank Placeholder Cryptography
//!
//! Nothing in the workflow verifies signatures or proofs. This crate hands
//! out the opaque strings that stand in for them: transaction identifiers,
//! signatures and public keys, through an injectable generator.

pub mod placeholder;
pub mod hash;

pub use placeholder::{PlaceholderGenerator, RandomGenerator, SeededGenerator, SequentialGenerator};
pub use hash::sha256;

/// Prefix carried by every generated placeholder.
pub const HEX_PREFIX: &str = "0x";

/// Format bytes as a `0x`-prefixed lowercase hex string.
pub fn to_prefixed_hex(bytes: &[u8]) -> String {
    format!("{}{}", HEX_PREFIX, hex::encode(bytes))
}
