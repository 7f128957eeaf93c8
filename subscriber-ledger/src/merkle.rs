//! Merkle commitment engine
//!
//! Pure functions from an ordered record sequence to a single root.
//!
//! # Design
//!
//! - Binary Merkle tree with SHA-256 hashing
//! - Leaves are `SHA-256(identity || flow_rate)`
//! - Parents are `SHA-256(left || right)`
//! - An odd node at the end of a level is paired with itself
//! - Rebuilt from scratch on every call, no cached levels

use crate::types::{Commitment, SubscriberRecord};
use sha2::{Digest, Sha256};

/// 32-byte node hash
pub type Hash = [u8; 32];

/// Hash one record into a leaf
pub fn hash_leaf(record: &SubscriberRecord) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(record.leaf_encoding());
    hasher.finalize().into()
}

/// Hash a pair of nodes into their parent
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Leaf hashes of `records`, in order
pub fn leaves_of(records: &[SubscriberRecord]) -> Vec<Hash> {
    records.iter().map(hash_leaf).collect()
}

/// Number of combining rounds needed for `leaf_count` leaves
///
/// Ceiling log2, found by halving (rounding up) until one node is left.
pub fn tree_depth(leaf_count: usize) -> u32 {
    let mut width = leaf_count;
    let mut depth = 0;

    while width > 1 {
        width = (width + 1) / 2;
        depth += 1;
    }

    depth
}

/// Compute the Merkle root of `leaves`
///
/// One leaf is its own root. No leaves gives the all-zero hash.
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return [0u8; 32];
    }

    let mut current_level = leaves.to_vec();

    while current_level.len() > 1 {
        current_level = current_level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hash_pair(left, right),
                // Duplicate last hash if odd
                [last] => hash_pair(last, last),
                _ => unreachable!("chunks(2) yields one or two nodes"),
            })
            .collect();
    }

    current_level[0]
}

/// Commitment over `records`
pub fn root_of(records: &[SubscriberRecord]) -> Commitment {
    Commitment::from_bytes(merkle_root(&leaves_of(records)))
}
