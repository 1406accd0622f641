//! Cryptographic utilities for the mining engine
//!
//! This module provides:
//! - SHA-256 hashing and compact-target arithmetic
//! - ECDSA key management (secp256k1)
//! - Merkle commitments over transaction sequences

pub mod hash;
pub mod keys;
pub mod merkle;

pub use hash::{bits_to_target, double_sha256, hash_meets_target, sha256, Hash256};
pub use keys::{
    public_key_from_bytes, sign_digest, verify_signature, KeyError, KeyPair, PUBLIC_KEY_LEN,
    SIGNATURE_LEN,
};
pub use merkle::merkle_root;
