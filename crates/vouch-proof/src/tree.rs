//! Binary Merkle tree over leaf digests.
//!
//! Adjacent digests are paired left to right. An odd trailing node at any
//! level is paired with itself. Roots already published under this rule
//! depend on it, so it must not change.

use tracing::debug;
use vouch_core::{sha256_concat, FixedHash};

use crate::canonical::validate_record;
use crate::error::{ProofError, ProofResult};
use crate::leaf::build_leaf;
use crate::types::{Field, Leaf};

/// `SHA256(left ‖ right)`.
pub fn hash_pair(left: &FixedHash, right: &FixedHash) -> FixedHash {
    sha256_concat(&[left.as_bytes(), right.as_bytes()])
}

/// Number of levels above the leaves for `leaf_count` leaves.
pub fn tree_height(leaf_count: usize) -> usize {
    let mut width = leaf_count;
    let mut height = 0;
    while width > 1 {
        width = width.div_ceil(2);
        height += 1;
    }
    height
}

/// A fully built tree. Rebuilt, never mutated, when leaves change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    leaves: Vec<Leaf>,
    levels: Vec<Vec<FixedHash>>,
    root: FixedHash,
}

impl Tree {
    /// Build from leaves ordered by index `0..n`.
    pub fn from_leaves(leaves: Vec<Leaf>) -> ProofResult<Self> {
        if leaves.is_empty() {
            return Err(ProofError::EmptyRecord);
        }
        for (position, leaf) in leaves.iter().enumerate() {
            if leaf.index as usize != position {
                return Err(ProofError::MalformedProof(format!(
                    "leaf at position {} has index {}",
                    position, leaf.index
                )));
            }
        }

        let mut levels = vec![leaves.iter().map(|l| l.digest).collect::<Vec<_>>()];
        loop {
            let below = match levels.last() {
                Some(level) if level.len() > 1 => level,
                _ => break,
            };
            let next: Vec<FixedHash> = below
                .chunks(2)
                .map(|pair| {
                    let left = &pair[0];
                    let right = pair.get(1).unwrap_or(left);
                    hash_pair(left, right)
                })
                .collect();
            levels.push(next);
        }

        let root = levels
            .last()
            .and_then(|top| top.first())
            .copied()
            .ok_or(ProofError::EmptyRecord)?;

        Ok(Self {
            leaves,
            levels,
            root,
        })
    }

    pub fn root(&self) -> FixedHash {
        self.root
    }

    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    /// `levels()[0]` holds the leaf digests, the last level holds the root.
    pub fn levels(&self) -> &[Vec<FixedHash>] {
        &self.levels
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn height(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn leaf_by_name(&self, name: &str) -> Option<&Leaf> {
        self.leaves.iter().find(|l| l.name() == name)
    }
}

/// Canonicalize, hash and assemble a record's fields in declaration order.
pub fn build_tree(fields: &[Field]) -> ProofResult<Tree> {
    validate_record(fields)?;

    let leaves = fields
        .iter()
        .enumerate()
        .map(|(index, field)| build_leaf(field, index as u32))
        .collect::<ProofResult<Vec<_>>>()?;

    let tree = Tree::from_leaves(leaves)?;
    debug!(
        leaves = tree.leaf_count(),
        height = tree.height(),
        root = %tree.root(),
        "built record tree"
    );
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forecast() -> Vec<Field> {
        vec![
            Field::uint("probability", 7500),
            Field::string("marketId", "market-123"),
            Field::string("platform", "POLYMARKET"),
        ]
    }

    #[test]
    fn test_tree_height() {
        assert_eq!(tree_height(1), 0);
        assert_eq!(tree_height(2), 1);
        assert_eq!(tree_height(3), 2);
        assert_eq!(tree_height(4), 2);
        assert_eq!(tree_height(5), 3);
        assert_eq!(tree_height(8), 3);
        assert_eq!(tree_height(9), 4);
    }

    #[test]
    fn test_single_field_root_is_leaf_digest() {
        let tree = build_tree(&[Field::uint("score", 42)]).unwrap();
        assert_eq!(tree.root(), tree.leaves()[0].digest);
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.levels().len(), 1);
    }

    #[test]
    fn test_empty_record_rejected() {
        assert_eq!(build_tree(&[]), Err(ProofError::EmptyRecord));
    }

    #[test]
    fn test_odd_level_duplicates_last_node() {
        let tree = build_tree(&forecast()).unwrap();
        let l0 = &tree.levels()[0];
        assert_eq!(l0.len(), 3);

        let left = hash_pair(&l0[0], &l0[1]);
        let right = hash_pair(&l0[2], &l0[2]);
        assert_eq!(tree.levels()[1], vec![left, right]);
        assert_eq!(tree.root(), hash_pair(&left, &right));
    }

    #[test]
    fn test_root_is_deterministic() {
        assert_eq!(
            build_tree(&forecast()).unwrap().root(),
            build_tree(&forecast()).unwrap().root()
        );
    }

    #[test]
    fn test_root_is_order_sensitive() {
        let mut swapped = forecast();
        swapped.swap(0, 1);
        assert_ne!(
            build_tree(&forecast()).unwrap().root(),
            build_tree(&swapped).unwrap().root()
        );
    }

    #[test]
    fn test_swapping_equal_values_changes_root() {
        let ab = build_tree(&[Field::uint("a", 1), Field::uint("b", 1)]).unwrap();
        let ba = build_tree(&[Field::uint("b", 1), Field::uint("a", 1)]).unwrap();
        assert_ne!(ab.root(), ba.root());
    }

    #[test]
    fn test_from_leaves_requires_contiguous_indices() {
        let leaf = build_leaf(&Field::uint("a", 1), 1).unwrap();
        assert!(matches!(
            Tree::from_leaves(vec![leaf]),
            Err(ProofError::MalformedProof(_))
        ));
    }

    #[test]
    fn test_leaf_lookup_by_name() {
        let tree = build_tree(&forecast()).unwrap();
        assert_eq!(tree.leaf_by_name("platform").map(|l| l.index), Some(2));
        assert!(tree.leaf_by_name("missing").is_none());
    }
}
