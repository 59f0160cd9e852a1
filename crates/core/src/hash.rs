//! Content hash types and utilities.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A SHA-256 object identity represented as 32 raw bytes.
///
/// Rendered as 64 lowercase hex characters everywhere a string form is
/// needed (on-disk paths, object keys, database columns).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Create a Hash from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Compute the SHA-256 hash of `data`.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Create an incremental hasher.
    pub fn hasher() -> StreamHasher {
        StreamHasher(Sha256::new())
    }

    /// Parse from a 64-char lowercase hex string.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        if s.len() != 64 {
            return Err(crate::Error::InvalidHash(format!(
                "expected 64 hex chars, got {}",
                s.len()
            )));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hex_str = std::str::from_utf8(chunk)
                .map_err(|e| crate::Error::InvalidHash(e.to_string()))?;
            bytes[i] = u8::from_str_radix(hex_str, 16)
                .map_err(|e| crate::Error::InvalidHash(e.to_string()))?;
        }
        Ok(Self(bytes))
    }

    /// Encode as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Incremental SHA-256 hasher for streaming inputs.
pub struct StreamHasher(Sha256);

impl StreamHasher {
    /// Update the hasher with data.
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> Hash {
        Hash(self.0.finalize().into())
    }
}

/// A user-supplied hash prefix used for disambiguation.
///
/// Prefixes shorter than [`HashPrefix::MIN_LEN`] are rejected up front so
/// store backends never enumerate absurdly wide key ranges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashPrefix(String);

impl HashPrefix {
    /// Minimum accepted prefix length.
    pub const MIN_LEN: usize = 4;

    /// Validate and wrap a prefix string.
    pub fn new(s: impl Into<String>) -> crate::Result<Self> {
        let s = s.into();
        if s.len() < Self::MIN_LEN {
            return Err(crate::Error::InvalidPrefix(format!(
                "hash prefix too short: {} chars (min {})",
                s.len(),
                Self::MIN_LEN
            )));
        }
        let lowercase_hex = s
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if s.len() > 64 || !lowercase_hex {
            return Err(crate::Error::InvalidPrefix(format!(
                "hash prefix must be 4-64 lowercase hex chars: {s:?}"
            )));
        }
        Ok(Self(s))
    }

    /// The prefix string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The shard directory portion (first two chars).
    pub fn shard(&self) -> &str {
        &self.0[..2]
    }

    /// The portion of the prefix inside the shard (may be empty).
    pub fn rest(&self) -> &str {
        &self.0[2..]
    }
}

impl fmt::Display for HashPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_known_vector() {
        // SHA-256("hello world")
        let h = Hash::compute(b"hello world");
        assert_eq!(
            h.to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn hex_roundtrip() {
        let h = Hash::compute(b"abc");
        let parsed = Hash::from_hex(&h.to_hex()).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(Hash::from_hex("abcd").is_err());
        assert!(Hash::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn incremental_matches_oneshot() {
        let mut hasher = Hash::hasher();
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(hasher.finalize(), Hash::compute(b"hello world"));
    }

    #[test]
    fn prefix_validation() {
        assert!(HashPrefix::new("abc").is_err());
        assert!(HashPrefix::new("ABCD").is_err());
        assert!(HashPrefix::new("abxy").is_err());
        let p = HashPrefix::new("a8fd12").unwrap();
        assert_eq!(p.shard(), "a8");
        assert_eq!(p.rest(), "fd12");
    }
}
