//! ECDSA key management for transaction signing
//!
//! Provides key pair generation, signing, and verification using the
//! secp256k1 elliptic curve. The rest of the engine treats this module as an
//! opaque service: it signs 32-byte digests and verifies compact signatures,
//! and never interprets anything beyond "pay to a recipient identity".

use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

/// Length of a compressed secp256k1 public key, used as a recipient identity.
pub const PUBLIC_KEY_LEN: usize = 33;

/// Length of a compact ECDSA signature.
pub const SIGNATURE_LEN: usize = 64;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key = SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Get the compressed public key bytes, used as a recipient identity
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.public_key.serialize()
    }

    /// Sign a 32-byte message digest with the private key
    pub fn sign(&self, digest: &[u8; 32]) -> Result<[u8; SIGNATURE_LEN], KeyError> {
        sign_digest(&self.secret_key, digest)
    }

    /// Verify a compact signature against this key pair's public key
    pub fn verify(&self, digest: &[u8; 32], signature: &[u8; SIGNATURE_LEN]) -> bool {
        verify_signature(&self.public_key, digest, signature)
    }
}

/// Parse a recipient identity back into a public key
pub fn public_key_from_bytes(bytes: &[u8; PUBLIC_KEY_LEN]) -> Result<PublicKey, KeyError> {
    PublicKey::from_slice(bytes).map_err(|_| KeyError::InvalidPublicKey)
}

/// Sign a 32-byte digest with a secret key, producing a compact signature
pub fn sign_digest(
    secret_key: &SecretKey,
    digest: &[u8; 32],
) -> Result<[u8; SIGNATURE_LEN], KeyError> {
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(digest)?;
    let signature = secp.sign_ecdsa(&message, secret_key);
    Ok(signature.serialize_compact())
}

/// Verify a compact signature over a 32-byte digest
pub fn verify_signature(
    public_key: &PublicKey,
    digest: &[u8; 32],
    signature: &[u8; SIGNATURE_LEN],
) -> bool {
    let secp = Secp256k1::new();

    let message = match Message::from_digest_slice(digest) {
        Ok(message) => message,
        Err(_) => return false,
    };
    let sig = match secp256k1::ecdsa::Signature::from_compact(signature) {
        Ok(sig) => sig,
        Err(_) => return false,
    };

    secp.verify_ecdsa(&message, &sig, public_key).is_ok()
}
