//! Pure synchronous hash trait for identity digests
//!
//! Hashing is deterministic and side-effect free, so it is a plain trait
//! rather than an effect interface. The algorithm is selected once through
//! the `ALGORITHM` constant; every guardian digest in the system is produced
//! through [`hash`], so swapping algorithms is a one-line change.
//!
//! Current algorithm: **SHA-256** (32-byte output)

use sha2::{Digest, Sha256};
use std::fmt;

/// Synchronous trait for cryptographic hashing.
pub trait HashAlgorithm: Send + Sync + fmt::Debug {
    /// Hash arbitrary bytes to a 32-byte digest.
    fn hash(&self, data: &[u8]) -> [u8; 32];
}

/// SHA-256 (NIST FIPS 180-4).
#[derive(Debug, Clone, Copy)]
pub struct Sha256Algorithm;

impl HashAlgorithm for Sha256Algorithm {
    fn hash(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.finalize().into()
    }
}

/// The hash algorithm used for every digest in the system.
pub const ALGORITHM: Sha256Algorithm = Sha256Algorithm;

/// Hash `data` with the selected algorithm.
#[inline]
pub fn hash(data: &[u8]) -> [u8; 32] {
    ALGORITHM.hash(data)
}
