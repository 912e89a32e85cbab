//! Proof verification.
//!
//! Runs with only the proof and an independently obtained root. Every
//! structural property of the proof is re-checked; any failure makes the
//! whole proof invalid.

use std::collections::HashSet;

use tracing::{debug, warn};
use vouch_core::FixedHash;

use crate::error::{ProofError, ProofResult};
use crate::leaf::build_leaf;
use crate::tree::{hash_pair, tree_height};
use crate::types::{FieldVerdict, Proof, RevealedField, VerificationReport};

/// Verify `proof` against `expected_root`, reporting per-field verdicts.
pub fn verify_proof_report(proof: &Proof, expected_root: &FixedHash) -> VerificationReport {
    let mut report = VerificationReport {
        fields: Vec::with_capacity(proof.revealed_fields.len()),
        proof_root: proof.root,
        expected_root: *expected_root,
        outcome: Ok(()),
    };

    if let Err(e) = check_structure(proof) {
        warn!(error = %e, "rejecting malformed proof");
        report.outcome = Err(e);
        return report;
    }

    let mut first_failure = None;
    for revealed in &proof.revealed_fields {
        let (recomputed, result) = match fold_to_root(revealed, proof.leaf_count) {
            Ok(root) if root == proof.root => (Some(root), Ok(())),
            Ok(root) => (
                Some(root),
                Err(ProofError::RootMismatch(revealed.leaf.name().to_string())),
            ),
            Err(e) => (None, Err(e)),
        };

        report.fields.push(FieldVerdict {
            index: revealed.leaf.index,
            name: revealed.leaf.name().to_string(),
            valid: result.is_ok(),
            recomputed_root: recomputed,
        });
        if let Err(e) = result {
            first_failure.get_or_insert(e);
        }
    }

    report.outcome = match first_failure {
        Some(e) => Err(e),
        None if proof.root != *expected_root => Err(ProofError::RootNotPublished),
        None => Ok(()),
    };

    match &report.outcome {
        Ok(()) => debug!(
            revealed = proof.revealed_fields.len(),
            root = %proof.root,
            "proof verified"
        ),
        Err(e) => warn!(
            error = %e,
            revealed = proof.revealed_fields.len(),
            "proof verification failed"
        ),
    }
    report
}

/// Boolean verification. Fails closed: anything but full success is `false`.
pub fn verify_proof(proof: &Proof, expected_root: &FixedHash) -> bool {
    verify_proof_report(proof, expected_root).is_valid()
}

/// Like [`verify_proof`] but surfaces the first failure.
pub fn check_proof(proof: &Proof, expected_root: &FixedHash) -> ProofResult<()> {
    verify_proof_report(proof, expected_root).outcome
}

fn check_structure(proof: &Proof) -> ProofResult<()> {
    if proof.revealed_fields.is_empty() {
        return Err(ProofError::MalformedProof("empty reveal set".into()));
    }
    if proof.leaf_count == 0 {
        return Err(ProofError::MalformedProof("leaf count is zero".into()));
    }

    let height = tree_height(proof.leaf_count as usize);
    let mut indices = HashSet::with_capacity(proof.revealed_fields.len());
    for revealed in &proof.revealed_fields {
        let index = revealed.leaf.index;
        if !indices.insert(index) {
            return Err(ProofError::MalformedProof(format!(
                "duplicate leaf index {}",
                index
            )));
        }
        if index >= proof.leaf_count {
            return Err(ProofError::MalformedProof(format!(
                "leaf index {} out of range for {} leaves",
                index, proof.leaf_count
            )));
        }
        if revealed.path.leaf_index != index {
            return Err(ProofError::MalformedProof(format!(
                "path for index {} attached to leaf {}",
                revealed.path.leaf_index, index
            )));
        }
        if revealed.path.len() != height {
            return Err(ProofError::MalformedProof(format!(
                "path length {} does not match tree height {}",
                revealed.path.len(),
                height
            )));
        }
    }
    Ok(())
}

/// Recompute the leaf from the claimed field and fold its path upward.
///
/// The carried encoding and digest are never trusted; they must equal the
/// recomputed ones or the proof is malformed.
fn fold_to_root(revealed: &RevealedField, leaf_count: u32) -> ProofResult<FixedHash> {
    let leaf = build_leaf(&revealed.leaf.field, revealed.leaf.index)?;
    if leaf.encoding != revealed.leaf.encoding {
        return Err(ProofError::MalformedProof(format!(
            "carried encoding for leaf {} does not match its field",
            leaf.index
        )));
    }
    if leaf.digest != revealed.leaf.digest {
        return Err(ProofError::MalformedProof(format!(
            "carried digest for leaf {} is not H(index ‖ encoding)",
            leaf.index
        )));
    }

    let mut current = leaf.digest;
    let mut position = leaf.index as usize;
    let mut width = leaf_count as usize;

    for (level, step) in revealed.path.steps.iter().enumerate() {
        let expect_right = position % 2 == 0;
        if step.sibling_is_on_right != expect_right {
            return Err(ProofError::MalformedProof(format!(
                "side flag at level {} disagrees with position {}",
                level, position
            )));
        }

        let expect_duplicate = expect_right && position + 1 == width;
        if step.duplicate != expect_duplicate {
            return Err(ProofError::MalformedProof(format!(
                "duplicate flag at level {} disagrees with level width {}",
                level, width
            )));
        }
        if step.duplicate && step.sibling != current {
            return Err(ProofError::MalformedProof(format!(
                "duplicated sibling at level {} is not the node itself",
                level
            )));
        }

        current = if step.sibling_is_on_right {
            hash_pair(&current, &step.sibling)
        } else {
            hash_pair(&step.sibling, &current)
        };
        position /= 2;
        width = width.div_ceil(2);
    }

    Ok(current)
}
