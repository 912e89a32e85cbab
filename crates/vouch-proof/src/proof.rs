use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{ProofError, ProofResult};
use crate::tree::Tree;
use crate::types::{AuthenticationPath, PathStep, Proof, RevealedField};

/// Authentication path for the leaf at `leaf_index`.
///
/// A node that is the odd trailing element of its level is paired with
/// itself; that step carries its own digest and is flagged `duplicate`.
pub fn authentication_path(tree: &Tree, leaf_index: u32) -> ProofResult<AuthenticationPath> {
    let mut position = leaf_index as usize;
    if position >= tree.leaf_count() {
        return Err(ProofError::MalformedProof(format!(
            "leaf index {} out of range for {} leaves",
            leaf_index,
            tree.leaf_count()
        )));
    }

    let levels = tree.levels();
    let mut steps = Vec::with_capacity(tree.height());
    for level in &levels[..levels.len() - 1] {
        let step = if position % 2 == 1 {
            PathStep {
                sibling: level[position - 1],
                sibling_is_on_right: false,
                duplicate: false,
            }
        } else if let Some(right) = level.get(position + 1) {
            PathStep {
                sibling: *right,
                sibling_is_on_right: true,
                duplicate: false,
            }
        } else {
            PathStep {
                sibling: level[position],
                sibling_is_on_right: true,
                duplicate: true,
            }
        };
        steps.push(step);
        position /= 2;
    }

    Ok(AuthenticationPath { leaf_index, steps })
}

/// Build a proof revealing `names` from `tree`.
///
/// Names are de-duplicated and the revealed fields come out in index
/// order. Undisclosed leaves only ever appear as sibling digests.
pub fn generate_proof<S: AsRef<str>>(tree: &Tree, names: &[S]) -> ProofResult<Proof> {
    if names.is_empty() {
        return Err(ProofError::EmptyReveal);
    }

    let mut selected = BTreeMap::new();
    for name in names {
        let name = name.as_ref();
        let leaf = tree
            .leaf_by_name(name)
            .ok_or_else(|| ProofError::FieldNotFound(name.to_string()))?;
        selected.entry(leaf.index).or_insert(leaf);
    }

    let revealed_fields = selected
        .into_values()
        .map(|leaf| {
            Ok(RevealedField {
                leaf: leaf.clone(),
                path: authentication_path(tree, leaf.index)?,
            })
        })
        .collect::<ProofResult<Vec<_>>>()?;

    debug!(
        revealed = revealed_fields.len(),
        leaves = tree.leaf_count(),
        root = %tree.root(),
        "generated selective-disclosure proof"
    );

    Ok(Proof {
        root: tree.root(),
        leaf_count: tree.leaf_count() as u32,
        revealed_fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::build_tree;
    use crate::types::Field;

    fn five_fields() -> Tree {
        build_tree(&[
            Field::uint("a", 1),
            Field::uint("b", 2),
            Field::uint("c", 3),
            Field::uint("d", 4),
            Field::uint("e", 5),
        ])
        .unwrap()
    }

    #[test]
    fn test_path_length_equals_height() {
        let tree = five_fields();
        for i in 0..5 {
            assert_eq!(authentication_path(&tree, i).unwrap().len(), tree.height());
        }
    }

    #[test]
    fn test_trailing_leaf_gets_duplicate_steps() {
        let tree = five_fields();
        let path = authentication_path(&tree, 4).unwrap();
        // Level widths 5 -> 3 -> 2 -> 1: leaf 4 is trailing at levels 0 and 1.
        assert!(path.steps[0].duplicate);
        assert_eq!(path.steps[0].sibling, tree.levels()[0][4]);
        assert!(path.steps[1].duplicate);
        assert!(!path.steps[2].duplicate);
        assert!(!path.steps[2].sibling_is_on_right);
    }

    #[test]
    fn test_side_flags_follow_parity() {
        let tree = five_fields();
        let path = authentication_path(&tree, 1).unwrap();
        assert!(!path.steps[0].sibling_is_on_right);
        assert_eq!(path.steps[0].sibling, tree.levels()[0][0]);
        assert!(path.steps[1].sibling_is_on_right);
    }

    #[test]
    fn test_generate_proof_orders_and_dedups() {
        let tree = five_fields();
        let proof = generate_proof(&tree, &["d", "a", "d"]).unwrap();
        assert_eq!(proof.revealed_names(), vec!["a", "d"]);
        assert_eq!(proof.leaf_count, 5);
        assert_eq!(proof.root, tree.root());
    }

    #[test]
    fn test_generate_proof_errors() {
        let tree = five_fields();
        let none: [&str; 0] = [];
        assert_eq!(generate_proof(&tree, &none), Err(ProofError::EmptyReveal));
        assert_eq!(
            generate_proof(&tree, &["zzz"]),
            Err(ProofError::FieldNotFound("zzz".into()))
        );
    }

    #[test]
    fn test_out_of_range_index() {
        let tree = five_fields();
        assert!(authentication_path(&tree, 5).is_err());
    }
}
