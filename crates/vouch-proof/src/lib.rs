//! Vouch Proof
//!
//! Selective-disclosure commitments over structured records.
//!
//! ```text
//! Field -> CanonicalEncoding -> Leaf -> Tree -> Proof -> VerificationReport
//! ```
//!
//! - canonical: type-tagged deterministic byte encoding per field
//! - leaf: `SHA256(index ‖ encoding)` leaf digests
//! - tree: binary Merkle tree, odd trailing node paired with itself
//! - proof: authentication paths for a chosen subset of fields
//! - verify: fail-closed recomputation against an independently known root
//!
//! Everything here is pure and stateless; trees and proofs may be built and
//! checked concurrently from any number of threads.

pub mod canonical;
pub mod error;
pub mod leaf;
pub mod proof;
pub mod tree;
pub mod types;
pub mod verify;

pub use canonical::{canonicalize, fields_from_json, validate_record};
pub use error::{ProofError, ProofResult};
pub use leaf::{build_leaf, hash_leaf};
pub use proof::{authentication_path, generate_proof};
pub use tree::{build_tree, hash_pair, tree_height, Tree};
pub use types::{
    AuthenticationPath, CanonicalEncoding, Field, FieldType, FieldValue, FieldVerdict, Leaf,
    PathStep, Proof, RawField, RevealedField, VerificationReport,
};
pub use verify::{check_proof, verify_proof, verify_proof_report};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proof_survives_json_transport() {
        let tree = build_tree(&[
            Field::uint("probability", 7500),
            Field::string("marketId", "market-123"),
            Field::bytes("nonce", vec![1, 2, 3]),
            Field::address("wallet", [0x5a; 20]),
        ])
        .unwrap();
        let proof = generate_proof(&tree, &["probability", "wallet"]).unwrap();

        let json = serde_json::to_string(&proof).unwrap();
        assert!(!json.contains("market-123"));
        let received: Proof = serde_json::from_str(&json).unwrap();
        assert_eq!(received, proof);
        assert!(verify_proof(&received, &tree.root()));
    }
}
