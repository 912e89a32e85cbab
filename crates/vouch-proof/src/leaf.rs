use vouch_core::{sha256_concat, FixedHash};

use crate::canonical::canonicalize;
use crate::error::ProofResult;
use crate::types::{CanonicalEncoding, Field, Leaf};

/// `SHA256(index_be32 ‖ encoding)`.
pub fn hash_leaf(index: u32, encoding: &CanonicalEncoding) -> FixedHash {
    sha256_concat(&[&index.to_be_bytes(), encoding.as_bytes()])
}

/// Canonicalize and hash one field at `index`.
pub fn build_leaf(field: &Field, index: u32) -> ProofResult<Leaf> {
    let encoding = canonicalize(field, index)?;
    let digest = hash_leaf(index, &encoding);
    Ok(Leaf {
        index,
        field: field.clone(),
        encoding,
        digest,
    })
}
