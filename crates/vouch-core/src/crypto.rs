use sha2::{Digest, Sha256};

use crate::types::FixedHash;

/// SHA-256 over the concatenation of `parts`.
pub fn sha256_concat(parts: &[&[u8]]) -> FixedHash {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    FixedHash(hasher.finalize().into())
}

/// SHA-256 of a single buffer.
pub fn sha256(data: &[u8]) -> FixedHash {
    FixedHash(Sha256::digest(data).into())
}
