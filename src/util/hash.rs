//! Hashing utilities for output naming and toolchain fingerprints.

use sha2::{Digest, Sha256};

/// Compute SHA256 hash of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute SHA256 hash of a string.
pub fn sha256_str(s: &str) -> String {
    sha256_bytes(s.as_bytes())
}

/// Short hash suitable for directory names.
pub fn short_hash(s: &str) -> String {
    let mut hash = sha256_str(s);
    hash.truncate(16);
    hash
}

/// Hash a sequence of fields with separators, so that `["ab", "c"]` and
/// `["a", "bc"]` differ.
pub fn fingerprint<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update(field.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}
