//! # colorchain
//!
//! A block-assembly and proof-of-work mining engine for a colored-coin
//! ledger. Transactions carry no amounts; an output's worth is whatever
//! spends it, and each output may carry an opaque 32-bit color tag that
//! applications interpret however they like. Every structure has a single
//! canonical binary encoding, so block and transaction identities are
//! stable double-SHA-256 digests of those bytes.
//!
//! ## Example
//!
//! Mine the first block on top of the built-in genesis block:
//!
//! ```
//! use colorchain::{Block, KeyPair, Miner, MinerConfig, Transaction};
//!
//! let key = KeyPair::generate();
//! let coinbase = Transaction::new()
//!     .coinbase_at(0, 1)
//!     .to(key.public_key_bytes());
//!
//! let config = MinerConfig::new(coinbase, Block::genesis(), 1_432_594_281, 0x1f0fffff);
//! let mut miner = Miner::new(config);
//!
//! let block = miner.run().unwrap();
//! assert_eq!(block.header.height, 1);
//! assert!(block.validate().is_ok());
//! ```

pub mod core;
pub mod crypto;
pub mod mining;

pub use crate::core::{
    Block, BlockError, CodecError, Header, Transaction, TxInput, TxOutput, TxSignature,
    BLOCK_VERSION, GENESIS_BITS, GENESIS_NONCE, GENESIS_TIME, HEADER_SIZE, MAX_BLOCK_TXS,
    MAX_TX_PUTS, SEQUENCE_FINAL,
};
pub use crate::crypto::{
    bits_to_target, double_sha256, hash_meets_target, merkle_root, sha256, Hash256, KeyError,
    KeyPair, PUBLIC_KEY_LEN, SIGNATURE_LEN,
};
pub use crate::mining::{AcceptError, BlockTemplate, Miner, MinerConfig, MinerError, MinerState};
