//! Core ledger components
//!
//! This module contains the fundamental building blocks:
//! - The canonical binary codec (strict, deterministic, round-trips exactly)
//! - Transactions (inputs, outputs, color tags, builder-style mutation)
//! - Blocks and headers (proof-of-work identity, root sentinel)

pub mod block;
pub mod encoding;
pub mod transaction;

pub use block::{
    Block, BlockError, Header, BLOCK_VERSION, GENESIS_BITS, GENESIS_NONCE, GENESIS_TIME,
    HEADER_SIZE,
};
pub use encoding::{CodecError, Reader, MAX_BLOCK_TXS, MAX_TX_PUTS};
pub use transaction::{
    Transaction, TxInput, TxOutput, TxSignature, SEQUENCE_FINAL,
};
