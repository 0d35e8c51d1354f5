//! Merkle proof engine.
//!
//! Trees follow the Bitcoin construction: leaves are paired left to right,
//! an odd node at the end of a layer is paired with itself, and each parent
//! is `hash256(left || right)`.
//!
//! Verification is the "safe" variant: a step where the running hash sits on
//! the right and its sibling equals it is rejected. Such a step can only come
//! from a duplicated node, and accepting it would let one leaf be proven at
//! two different positions.

use crate::codec::{Decodable, Decoder, Encodable, Encoder};
use crate::crypto::hash_pair;
use crate::error::{CoreError, Result};
use crate::types::Hash256;

/// Compute the root reached from `leaf` by walking `branch` at `index`.
///
/// Returns `None` (the null root) when a step violates the safety rule.
pub fn compute_root(leaf: &Hash256, branch: &[Hash256], index: u32) -> Option<Hash256> {
    let mut hash = *leaf;
    let mut index = index;
    for sibling in branch {
        if index & 1 == 1 {
            if *sibling == hash {
                return None;
            }
            hash = hash_pair(sibling, &hash);
        } else {
            hash = hash_pair(&hash, sibling);
        }
        index >>= 1;
    }
    Some(hash)
}

/// Merkle root over `leaves`; the zero hash for an empty list.
pub fn merkle_root(leaves: &[Hash256]) -> Hash256 {
    MerkleTree::build(leaves).root()
}

/// A fully materialised Merkle tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    layers: Vec<Vec<Hash256>>,
}

impl MerkleTree {
    pub fn build(leaves: &[Hash256]) -> Self {
        if leaves.is_empty() {
            return Self { layers: Vec::new() };
        }
        let mut layers = vec![leaves.to_vec()];
        while let Some(layer) = layers.last().filter(|l| l.len() > 1) {
            let parent = layer
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    [single] => hash_pair(single, single),
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            layers.push(parent);
        }
        Self { layers }
    }

    pub fn root(&self) -> Hash256 {
        self.layers
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or(Hash256::ZERO)
    }

    pub fn leaf_count(&self) -> usize {
        self.layers.first().map_or(0, Vec::len)
    }

    /// Sibling path from leaf `index` to the root, bottom first.
    pub fn branch(&self, index: usize) -> Option<Vec<Hash256>> {
        if index >= self.leaf_count() {
            return None;
        }
        let mut path = Vec::with_capacity(self.layers.len().saturating_sub(1));
        let mut i = index;
        for layer in &self.layers[..self.layers.len() - 1] {
            let sibling = (i ^ 1).min(layer.len() - 1);
            path.push(layer[sibling]);
            i >>= 1;
        }
        Some(path)
    }
}

/// A position plus sibling path proving a leaf under some root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MerkleBranch {
    pub index: u32,
    pub branch: Vec<Hash256>,
}

impl MerkleBranch {
    pub fn new(index: u32, branch: Vec<Hash256>) -> Self {
        Self { index, branch }
    }

    /// Build the branch for `leaves[index]`.
    pub fn from_leaves(leaves: &[Hash256], index: usize) -> Option<Self> {
        let branch = MerkleTree::build(leaves).branch(index)?;
        let index = u32::try_from(index).ok()?;
        Some(Self { index, branch })
    }

    /// Root reached from `leaf`, or `None` if the path is not canonical.
    pub fn exec(&self, leaf: &Hash256) -> Option<Hash256> {
        compute_root(leaf, &self.branch, self.index)
    }

    /// Extend a branch proving `leaf ⊂ inner_root` with one proving
    /// `inner_root ⊂ outer_root`.
    ///
    /// The outer index is shifted above the inner path's levels and the
    /// sibling lists are concatenated.
    pub fn compose(mut self, outer: MerkleBranch) -> Result<Self> {
        let levels = self.branch.len();
        let shifted = if outer.index == 0 {
            0u64
        } else if levels >= 32 {
            return Err(CoreError::BranchTooLong(levels + outer.branch.len()));
        } else {
            (outer.index as u64) << levels
        };
        self.index = u32::try_from(self.index as u64 + shifted)
            .map_err(|_| CoreError::BranchTooLong(levels + outer.branch.len()))?;
        self.branch.extend(outer.branch);
        Ok(self)
    }
}

impl Encodable for MerkleBranch {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_varint(self.index as u64);
        self.branch.encode(enc);
    }
}

impl Decodable for MerkleBranch {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        let index = u32::try_from(dec.read_varint()?).map_err(|_| CoreError::VarIntOverflow)?;
        let branch = Vec::decode(dec)?;
        Ok(Self { index, branch })
    }
}
