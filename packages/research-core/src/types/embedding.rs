//! Content-addressed keys for the embedding cache.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 digest of the exact text bytes submitted for embedding.
///
/// Identical text (byte-for-byte) always produces the same hash, which is
/// what makes the cache a pure memoization layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash the given text.
    pub fn of(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Wrap an existing lowercase hex digest (e.g. read back from storage).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The 64-character lowercase hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode a vector as little-endian `f32` bytes for blob storage.
pub fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode little-endian `f32` bytes. Trailing partial chunks are ignored.
pub fn vector_from_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable() {
        let a = ContentHash::of("Hello, world!");
        let b = ContentHash::of("Hello, world!");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert_ne!(a, ContentHash::of("Hello, world"));
    }

    #[test]
    fn test_content_hash_is_byte_exact() {
        assert_ne!(ContentHash::of("text"), ContentHash::of("text "));
        assert_ne!(ContentHash::of("Text"), ContentHash::of("text"));
    }

    #[test]
    fn test_vector_bytes() {
        let vector = vec![0.25, -1.5, 3.0];
        let bytes = vector_to_bytes(&vector);
        assert_eq!(bytes.len(), 12);
        assert_eq!(vector_from_bytes(&bytes), vector);
    }
}
