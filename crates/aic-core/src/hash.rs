//! Pure synchronous hash trait for content addressing
//!
//! PIDs are defined over SHA-256. The algorithm sits behind a trait so the
//! codec has a single place to get its digest from, and so tests can feed
//! precomputed digests into the encoder.

use sha2::{Digest, Sha256};
use std::fmt;

/// Synchronous trait for cryptographic hashing
pub trait HashAlgorithm: Send + Sync + fmt::Debug {
    /// Hash arbitrary bytes to a 32-byte digest
    fn hash(&self, data: &[u8]) -> [u8; 32];
}

/// SHA-256 hash implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Algorithm;

impl HashAlgorithm for Sha256Algorithm {
    fn hash(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.finalize().into()
    }
}

/// The hash algorithm used for content addressing.
pub const ALGORITHM: Sha256Algorithm = Sha256Algorithm;

/// Hash bytes with the content-addressing algorithm
pub fn hash(data: &[u8]) -> [u8; 32] {
    ALGORITHM.hash(data)
}
