//! Generators for placeholder identifiers and key material.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};

use crate::{hash::sha256, to_prefixed_hex};

/// Length in bytes of a generated transaction identifier.
pub const ID_BYTES: usize = 16;

/// Length in bytes of a generated signature or public key.
pub const KEY_BYTES: usize = 32;

/// Source of placeholder values. Injected wherever the workflow needs a
/// fresh identifier or fake key material, so tests can supply fixed values.
pub trait PlaceholderGenerator: Send + Sync {
    /// Fresh transaction identifier.
    fn transaction_id(&self) -> String;

    /// Placeholder signature.
    fn signature(&self) -> String;

    /// Placeholder public key.
    fn public_key(&self) -> String;
}

/// Generator backed by the operating system's CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomGenerator;

impl RandomGenerator {
    /// Create a new random generator.
    pub fn new() -> Self {
        Self
    }

    fn random_hex(len: usize) -> String {
        let mut bytes = vec![0u8; len];
        OsRng.fill_bytes(&mut bytes);
        to_prefixed_hex(&bytes)
    }
}

impl PlaceholderGenerator for RandomGenerator {
    fn transaction_id(&self) -> String {
        Self::random_hex(ID_BYTES)
    }

    fn signature(&self) -> String {
        Self::random_hex(KEY_BYTES)
    }

    fn public_key(&self) -> String {
        Self::random_hex(KEY_BYTES)
    }
}

/// Generator driven by a seeded PRNG, for reproducible simulation runs.
pub struct SeededGenerator {
    rng: Mutex<StdRng>,
}

impl SeededGenerator {
    /// Create a generator from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn next_hex(&self, len: usize) -> String {
        let mut bytes = vec![0u8; len];
        self.rng.lock().fill_bytes(&mut bytes);
        to_prefixed_hex(&bytes)
    }
}

impl PlaceholderGenerator for SeededGenerator {
    fn transaction_id(&self) -> String {
        self.next_hex(ID_BYTES)
    }

    fn signature(&self) -> String {
        self.next_hex(KEY_BYTES)
    }

    fn public_key(&self) -> String {
        self.next_hex(KEY_BYTES)
    }
}

/// Deterministic generator: every value is the hash of a label and a
/// monotonically increasing counter.
#[derive(Debug)]
pub struct SequentialGenerator {
    label: String,
    counter: AtomicU64,
}

impl SequentialGenerator {
    /// Create a generator whose outputs are derived from `label`.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Number of values handed out so far.
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    fn derive(&self, kind: &str, len: usize) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let digest = sha256(format!("{}:{}:{}", self.label, kind, n).as_bytes());
        to_prefixed_hex(&digest[..len])
    }
}

impl PlaceholderGenerator for SequentialGenerator {
    fn transaction_id(&self) -> String {
        self.derive("tx", ID_BYTES)
    }

    fn signature(&self) -> String {
        self.derive("sig", KEY_BYTES)
    }

    fn public_key(&self) -> String {
        self.derive("pk", KEY_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_prefixed_hex(value: &str, bytes: usize) -> bool {
        value.len() == 2 + bytes * 2
            && value.starts_with("0x")
            && value[2..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    }

    #[test]
    fn test_random_format() {
        let generator = RandomGenerator::new();

        assert!(is_prefixed_hex(&generator.transaction_id(), ID_BYTES));
        assert!(is_prefixed_hex(&generator.signature(), KEY_BYTES));
        assert!(is_prefixed_hex(&generator.public_key(), KEY_BYTES));
    }

    #[test]
    fn test_random_ids_differ() {
        let generator = RandomGenerator::new();
        assert_ne!(generator.transaction_id(), generator.transaction_id());
    }

    #[test]
    fn test_sequential_is_deterministic() {
        let a = SequentialGenerator::new("test");
        let b = SequentialGenerator::new("test");

        assert_eq!(a.transaction_id(), b.transaction_id());
        assert_eq!(a.signature(), b.signature());
        assert_ne!(a.transaction_id(), a.transaction_id());
        assert_eq!(a.issued(), 4);
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = SeededGenerator::new(42);
        let b = SeededGenerator::new(42);

        assert_eq!(a.transaction_id(), b.transaction_id());
        assert_eq!(a.public_key(), b.public_key());
        assert!(is_prefixed_hex(&a.signature(), KEY_BYTES));
    }
}
