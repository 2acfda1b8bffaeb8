//! Sparse Merkle map used as the authenticated signer set
//!
//! The map has one leaf for every possible 256-bit key. A leaf holds a value
//! digest; [`Digest::ZERO`] means "absent". Only non-empty leaves are stored,
//! every empty subtree hashes to a precomputed default, so the key space is
//! never materialized.
//!
//! The wallet itself only ever sees a root and a [`MerkleMapWitness`]. The
//! witness recomputes a root for a claimed leaf value without touching any
//! store, which is what lets a single witness prove the old value and derive
//! the new root.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::hash::{hash_pair, Digest};

/// Number of levels between a leaf and the root
pub const MAP_DEPTH: usize = 256;

/// Errors raised by malformed witnesses
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("witness has {got} siblings, expected {expected}")]
    InvalidDepth { expected: usize, got: usize },
    #[error("witness direction path has {got} entries, expected {expected}")]
    InvalidPath { expected: usize, got: usize },
    #[error("witness is for a different key")]
    KeyMismatch,
}

/// Hashes of empty subtrees, indexed by height (0 = leaf)
fn empty_hashes() -> &'static [Digest] {
    static EMPTY: OnceLock<Vec<Digest>> = OnceLock::new();
    EMPTY.get_or_init(|| {
        let mut hashes = Vec::with_capacity(MAP_DEPTH + 1);
        hashes.push(Digest::ZERO);
        for height in 0..MAP_DEPTH {
            let below = hashes[height];
            hashes.push(hash_pair(&below, &below));
        }
        hashes
    })
}

/// Root of a map with no entries
pub fn empty_root() -> Digest {
    empty_hashes()[MAP_DEPTH]
}

/// Authentication path for one key of the map
///
/// `siblings[0]` is the sibling of the leaf, the last entry is a child of the
/// root. `is_left[i]` is true when the path node at level `i` is a left child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleMapWitness {
    pub siblings: Vec<Digest>,
    pub is_left: Vec<bool>,
}

impl MerkleMapWitness {
    fn check_shape(&self) -> Result<(), MerkleError> {
        if self.siblings.len() != MAP_DEPTH {
            return Err(MerkleError::InvalidDepth {
                expected: MAP_DEPTH,
                got: self.siblings.len(),
            });
        }
        if self.is_left.len() != MAP_DEPTH {
            return Err(MerkleError::InvalidPath {
                expected: MAP_DEPTH,
                got: self.is_left.len(),
            });
        }
        Ok(())
    }

    /// Recompute the root for `value` at this witness's key, and the key itself
    pub fn compute_root_and_key(&self, value: &Digest) -> Result<(Digest, Digest), MerkleError> {
        self.check_shape()?;

        let mut current = *value;
        let mut key = Digest::ZERO;

        for (level, (sibling, is_left)) in self.siblings.iter().zip(&self.is_left).enumerate() {
            current = if *is_left {
                hash_pair(&current, sibling)
            } else {
                hash_pair(sibling, &current)
            };
            // Level 0 decides the last key bit, the top level the first.
            key.set_bit(MAP_DEPTH - 1 - level, !*is_left);
        }

        Ok((current, key))
    }

    /// True when this witness proves `key` holds `value` under `root`
    pub fn verify(&self, root: &Digest, key: &Digest, value: &Digest) -> bool {
        match self.compute_root_and_key(value) {
            Ok((computed_root, computed_key)) => computed_root == *root && computed_key == *key,
            Err(_) => false,
        }
    }

    /// Root after writing `new_value` at `key`. Pure: nothing is mutated.
    pub fn root_after_update(&self, key: &Digest, new_value: &Digest) -> Result<Digest, MerkleError> {
        let (root, computed_key) = self.compute_root_and_key(new_value)?;
        if computed_key != *key {
            log::debug!(
                "witness key {} does not match requested key {}",
                computed_key.short(),
                key.short()
            );
            return Err(MerkleError::KeyMismatch);
        }
        Ok(root)
    }
}

/// Membership check used by every signer-set operation
pub fn membership_proof_verify(
    root: &Digest,
    key: &Digest,
    claimed_value: &Digest,
    witness: &MerkleMapWitness,
) -> bool {
    witness.verify(root, key, claimed_value)
}

/// Full sparse Merkle map, held by clients to build witnesses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseMerkleMap {
    leaves: BTreeMap<Digest, Digest>,
}

impl SparseMerkleMap {
    pub fn new() -> Self {
        Self {
            leaves: BTreeMap::new(),
        }
    }

    /// Value at `key`, [`Digest::ZERO`] when absent
    pub fn get(&self, key: &Digest) -> Digest {
        self.leaves.get(key).copied().unwrap_or(Digest::ZERO)
    }

    /// Write a value. Writing zero removes the leaf.
    pub fn set(&mut self, key: Digest, value: Digest) {
        if value == Digest::ZERO {
            self.leaves.remove(&key);
        } else {
            self.leaves.insert(key, value);
        }
    }

    /// Number of non-empty leaves
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Digest> {
        self.leaves.keys()
    }

    pub fn root(&self) -> Digest {
        let entries: Vec<(&Digest, &Digest)> = self.leaves.iter().collect();
        subtree_root(&entries, 0)
    }

    /// Authentication path for `key`, whether or not it is present
    pub fn witness(&self, key: &Digest) -> MerkleMapWitness {
        let mut entries: Vec<(&Digest, &Digest)> = self.leaves.iter().collect();
        let mut siblings = Vec::with_capacity(MAP_DEPTH);
        let mut is_left = Vec::with_capacity(MAP_DEPTH);

        // Walk root to leaf, then flip into leaf-to-root order.
        for depth in 0..MAP_DEPTH {
            let goes_right = key.bit(depth);
            let (same, other): (Vec<_>, Vec<_>) = entries
                .into_iter()
                .partition(|(k, _)| k.bit(depth) == goes_right);
            siblings.push(subtree_root(&other, depth + 1));
            is_left.push(!goes_right);
            entries = same;
        }

        siblings.reverse();
        is_left.reverse();
        MerkleMapWitness { siblings, is_left }
    }
}

/// Root of the subtree at `depth` holding `entries`, which share a prefix
fn subtree_root(entries: &[(&Digest, &Digest)], depth: usize) -> Digest {
    if entries.is_empty() {
        return empty_hashes()[MAP_DEPTH - depth];
    }
    if depth == MAP_DEPTH {
        return *entries[0].1;
    }
    // Keys are sorted, so the left subtree is a prefix of the slice.
    let split = entries.partition_point(|(k, _)| !k.bit(depth));
    let left = subtree_root(&entries[..split], depth + 1);
    let right = subtree_root(&entries[split..], depth + 1);
    hash_pair(&left, &right)
}
