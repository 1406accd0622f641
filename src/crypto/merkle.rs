//! Merkle commitment over an ordered transaction sequence
//!
//! The block header commits to its transaction list through a binary hash
//! tree: leaves are transaction identities, each level pairs adjacent hashes
//! (duplicating the last on odd counts), and pairing repeats until a single
//! root remains. Permuting the leaves changes the root.

use super::hash::{double_sha256, Hash256};

/// Calculate the merkle root of an ordered list of transaction identities.
///
/// A single-element list commits to that identity unchanged.
pub fn merkle_root(leaves: &[Hash256]) -> Hash256 {
    if leaves.is_empty() {
        return double_sha256(b"");
    }

    let mut level: Vec<Hash256> = leaves.to_vec();

    while level.len() > 1 {
        let mut next = Vec::with_capacity((level.len() + 1) / 2);

        for pair in level.chunks(2) {
            let left = pair[0];
            // Duplicate the last hash when the level has odd length
            let right = if pair.len() == 2 { pair[1] } else { pair[0] };

            let mut combined = [0u8; 64];
            combined[..32].copy_from_slice(&left);
            combined[32..].copy_from_slice(&right);
            next.push(double_sha256(&combined));
        }

        level = next;
    }

    level[0]
}
