//! Hashing and proof-of-work target utilities
//!
//! Provides the SHA-256 based hash functions used for block identities,
//! transaction identities and merkle commitments, plus the compact
//! difficulty target ("bits") arithmetic the miner compares hashes against.

use sha2::{Digest, Sha256};

/// A 256-bit hash in big-endian byte order.
pub type Hash256 = [u8; 32];

/// Computes SHA-256 of the input data
pub fn sha256(data: &[u8]) -> Hash256 {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Computes double SHA-256 (SHA-256 of SHA-256)
/// Used for block and transaction identities, Bitcoin-style
pub fn double_sha256(data: &[u8]) -> Hash256 {
    sha256(&sha256(data))
}

/// Expand a compact target ("bits") into a full 256-bit big-endian target.
///
/// The compact form packs a one-byte exponent and a 3-byte mantissa:
/// `target = mantissa * 256^(exponent - 3)`. A mantissa with the sign bit
/// (0x00800000) set is not a valid positive target and expands to zero;
/// so does an exponent that would overflow the 256-bit width.
pub fn bits_to_target(bits: u32) -> Hash256 {
    let exponent = ((bits >> 24) & 0xff) as usize;
    let mantissa = bits & 0x007f_ffff;

    let mut target = [0u8; 32];

    if bits & 0x0080_0000 != 0 || exponent == 0 || mantissa == 0 {
        return target;
    }

    if exponent <= 3 {
        // Mantissa occupies fewer bytes than its nominal width
        let value = mantissa >> (8 * (3 - exponent));
        for i in 0..exponent {
            target[31 - i] = ((value >> (8 * i)) & 0xff) as u8;
        }
    } else if exponent <= 32 {
        let pos = 32 - exponent;
        target[pos] = ((mantissa >> 16) & 0xff) as u8;
        if pos + 1 < 32 {
            target[pos + 1] = ((mantissa >> 8) & 0xff) as u8;
        }
        if pos + 2 < 32 {
            target[pos + 2] = (mantissa & 0xff) as u8;
        }
    }
    // An exponent past the 256-bit width is an overflowed compact form
    // and stays at the unsatisfiable zero target, like the sign-bit case

    target
}

/// Check whether a hash satisfies a proof-of-work target.
///
/// Both arguments are 256-bit big-endian unsigned integers; the hash
/// satisfies the target when `hash <= target`.
pub fn hash_meets_target(hash: &Hash256, target: &Hash256) -> bool {
    for i in 0..32 {
        if hash[i] < target[i] {
            return true;
        }
        if hash[i] > target[i] {
            return false;
        }
    }
    true
}
