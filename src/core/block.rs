//! Block and header implementation
//!
//! A block is an immutable header plus an ordered transaction list with the
//! coinbase first. The header's canonical 84-byte encoding is what gets
//! hashed during mining; a block's identity is the double SHA-256 of it.

use crate::core::encoding::{CodecError, Reader, MAX_BLOCK_TXS};
use crate::core::transaction::Transaction;
use crate::crypto::{
    bits_to_target, double_sha256, hash_meets_target, merkle_root, Hash256,
};
use thiserror::Error;

/// Current block version
pub const BLOCK_VERSION: u32 = 1;

/// Canonical header size in bytes
pub const HEADER_SIZE: usize = 84;

/// Root sentinel timestamp (unix seconds)
pub const GENESIS_TIME: u32 = 1_433_037_823;

/// Root sentinel compact target
pub const GENESIS_BITS: u32 = 0x1e0fffff;

/// Nonce satisfying the root sentinel's declared target
pub const GENESIS_NONCE: u32 = 461_859;

/// Recipient identity of the root sentinel's coinbase output
const GENESIS_RECIPIENT: [u8; 33] = [
    0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x06, 0xfd, 0x1a, 0xf5, 0x68, 0x35,
    0x38, 0x87, 0xe6, 0x9e, 0x99, 0x29, 0x38, 0xcb, 0xd5, 0xd4, 0x0f, 0xb0, 0x26, 0x46, 0x7e,
    0x2f, 0xef, 0x7c,
];

/// Color tag on the root sentinel's coinbase output
const GENESIS_COLOR: u32 = 0x13371337;

/// Block validation errors
#[derive(Error, Debug)]
pub enum BlockError {
    #[error("Invalid proof of work")]
    InvalidProofOfWork,
    #[error("Invalid merkle root")]
    InvalidMerkleRoot,
    #[error("First transaction is not a coinbase")]
    MissingCoinbase,
}

/// Block header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Protocol version
    pub version: u32,
    /// Identity of the previous block; all zeroes for the root sentinel
    pub previous: Hash256,
    /// Merkle commitment over the ordered transaction list
    pub merkle_root: Hash256,
    /// Block time (unix seconds)
    pub time: u32,
    /// Compact proof-of-work target
    pub bits: u32,
    /// Proof-of-work nonce (wraps)
    pub nonce: u32,
    /// Chain height; 0 for the root sentinel
    pub height: u32,
}

impl Header {
    /// Canonical 84-byte encoding, the preimage of the block identity
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..36].copy_from_slice(&self.previous);
        out[36..68].copy_from_slice(&self.merkle_root);
        out[68..72].copy_from_slice(&self.time.to_le_bytes());
        out[72..76].copy_from_slice(&self.bits.to_le_bytes());
        out[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        out[80..84].copy_from_slice(&self.height.to_le_bytes());
        out
    }

    /// Decode one header from a reader
    pub fn decode_from(reader: &mut Reader) -> Result<Self, CodecError> {
        Ok(Self {
            version: reader.read_u32()?,
            previous: reader.read_hash()?,
            merkle_root: reader.read_hash()?,
            time: reader.read_u32()?,
            bits: reader.read_u32()?,
            nonce: reader.read_u32()?,
            height: reader.read_u32()?,
        })
    }

    /// Block identity: double SHA-256 of the encoded header
    pub fn id(&self) -> Hash256 {
        double_sha256(&self.encode())
    }

    /// The full 256-bit target this header's proof of work must satisfy
    pub fn target(&self) -> Hash256 {
        bits_to_target(self.bits)
    }

    /// Whether the header hash satisfies its own declared target
    pub fn valid_proof_of_work(&self) -> bool {
        hash_meets_target(&self.id(), &self.target())
    }
}

/// A block: header plus ordered transactions, coinbase first.
///
/// Blocks are produced by the proof-of-work search and are immutable from
/// then on; mutating one invalidates its proof of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// The chain's fixed origin block.
    ///
    /// Its identity and canonical encoding are published constants that
    /// downstream consumers hard-code; every field here is part of the
    /// contract.
    pub fn genesis() -> Self {
        let coinbase = Transaction::new()
            .coinbase_at(0, 0)
            .to(GENESIS_RECIPIENT)
            .colored(GENESIS_COLOR);

        let header = Header {
            version: BLOCK_VERSION,
            previous: [0u8; 32],
            merkle_root: merkle_root(&[coinbase.id()]),
            time: GENESIS_TIME,
            bits: GENESIS_BITS,
            nonce: GENESIS_NONCE,
            height: 0,
        };

        Self {
            header,
            transactions: vec![coinbase],
        }
    }

    /// Block identity
    pub fn id(&self) -> Hash256 {
        self.header.id()
    }

    /// Block identity as lowercase hex
    pub fn id_hex(&self) -> String {
        hex::encode(self.id())
    }

    /// The coinbase transaction (first in the block)
    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.first().filter(|tx| tx.is_coinbase())
    }

    /// Re-check the block's structural invariants: coinbase position,
    /// merkle commitment, and its own declared proof of work.
    pub fn validate(&self) -> Result<(), BlockError> {
        if self.coinbase().is_none() {
            return Err(BlockError::MissingCoinbase);
        }

        let leaves: Vec<Hash256> = self.transactions.iter().map(|tx| tx.id()).collect();
        if merkle_root(&leaves) != self.header.merkle_root {
            return Err(BlockError::InvalidMerkleRoot);
        }

        if !self.header.valid_proof_of_work() {
            return Err(BlockError::InvalidProofOfWork);
        }

        Ok(())
    }

    // =========================================================================
    // Canonical codec
    // =========================================================================

    /// Canonical byte encoding: header, transaction count, transactions
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + 4 + 128 * self.transactions.len());
        out.extend_from_slice(&self.header.encode());
        out.extend_from_slice(&(self.transactions.len() as u32).to_le_bytes());
        for tx in &self.transactions {
            tx.encode_into(&mut out);
        }
        out
    }

    /// Decode from a byte slice; the slice must contain exactly one block
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(bytes);
        let header = Header::decode_from(&mut reader)?;
        let tx_count = reader.read_count(MAX_BLOCK_TXS)?;
        let mut transactions = Vec::with_capacity(tx_count);
        for _ in 0..tx_count {
            transactions.push(Transaction::decode_from(&mut reader)?);
        }
        reader.finish()?;
        Ok(Self {
            header,
            transactions,
        })
    }

    /// Canonical lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.encode())
    }

    /// Decode from the canonical hex form
    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        Self::decode(&hex::decode(s)?)
    }
}
