//! Content fingerprints for materialized shader jobs.
//!
//! A fingerprint is the SHA-256 digest of a shader job's on-disk form and is
//! used as the result-cache key. Two states with equal fingerprints are
//! treated as identical for caching purposes; collision risk is accepted as
//! negligible.

use std::fmt;

use sha2::{Digest, Sha256};

/// Size of a fingerprint in bytes.
pub const FINGERPRINT_SIZE: usize = 32;

/// SHA-256 digest of a shader job's materialized files.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_SIZE]);

impl Fingerprint {
    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; FINGERPRINT_SIZE] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", hex::encode(self.0))
    }
}

/// Incremental fingerprint builder.
///
/// Feed it the bytes of every file that makes up one materialized shader job,
/// in a fixed order, then finalize.
pub struct FingerprintHasher {
    inner: Sha256,
}

impl FingerprintHasher {
    /// Creates an empty hasher.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    /// Absorbs more content into the digest.
    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// Finishes the digest.
    #[must_use]
    pub fn finalize(self) -> Fingerprint {
        Fingerprint(self.inner.finalize().into())
    }
}

impl Default for FingerprintHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Fingerprints a single byte buffer.
#[must_use]
pub fn fingerprint_bytes(bytes: &[u8]) -> Fingerprint {
    let mut hasher = FingerprintHasher::new();
    hasher.update(bytes);
    hasher.finalize()
}
