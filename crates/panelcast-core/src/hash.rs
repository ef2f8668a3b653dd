//! Content hashing used to suppress redundant transmissions
//!
//! Equal hashes are treated as equal content. A collision therefore means a
//! changed text is not retransmitted; that false negative is accepted.

use serde::Serialize;

/// Digest of a surface's full text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic hash over a full text
pub trait ContentHasher {
    fn digest(&self, text: &str) -> ContentHash;
}

/// SHA256 over the UTF-8 bytes, hex encoded
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn digest(&self, text: &str) -> ContentHash {
        ContentHash(sha256_hex(text.as_bytes()))
    }
}

/// Compute SHA256 hash of data and return as hex string
pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}
