//! Block template: the mutable pre-proof-of-work block state
//!
//! A template holds the header skeleton (previous reference, height, time,
//! bits, nonce) and the ordered transaction list, coinbase first. Candidate
//! transactions are accepted or rejected against the outputs the template
//! knows about: the previous tip's coinbase outputs plus the outputs of
//! transactions already in the template, so a transaction may spend an
//! output created earlier in the same block. Accepted transactions keep
//! insertion order; this engine defines no fee policy.

use crate::core::block::{Block, Header, BLOCK_VERSION};
use crate::core::transaction::Transaction;
use crate::crypto::{bits_to_target, merkle_root, Hash256, PUBLIC_KEY_LEN};
use log::debug;
use std::collections::HashMap;
use thiserror::Error;

/// Reference to a specific transaction output
type OutPoint = (Hash256, u32);

/// Reasons a candidate transaction is unacceptable for a template
#[derive(Error, Debug)]
pub enum AcceptError {
    #[error("Template already has a coinbase")]
    ExtraCoinbase,
    #[error("Transaction has no inputs")]
    NoInputs,
    #[error("Transaction is not signed")]
    Unsigned,
    #[error("Transaction signature does not verify")]
    BadSignature,
    #[error("Input {vout} of {txid} references an unknown output")]
    UnknownOutput { txid: String, vout: u32 },
    #[error("Output {vout} of {txid} is already spent in this template")]
    SpentOutput { txid: String, vout: u32 },
    #[error("Signer does not own output {vout} of {txid}")]
    WrongOwner { txid: String, vout: u32 },
}

/// Mutable block state owned by the proof-of-work search.
///
/// Frozen into an immutable [`Block`] the instant the search succeeds.
pub struct BlockTemplate {
    previous: Hash256,
    height: u32,
    pub(crate) time: u32,
    bits: u32,
    pub(crate) nonce: u32,
    target: Hash256,
    transactions: Vec<Transaction>,
    /// Unspent outputs visible to this template, keyed by outpoint
    spendable: HashMap<OutPoint, [u8; PUBLIC_KEY_LEN]>,
    /// Cached merkle root; cleared whenever the transaction list changes
    merkle_cache: Option<Hash256>,
}

impl BlockTemplate {
    /// Assemble a template extending `previous` with the given coinbase.
    ///
    /// The template's height is `previous.header.height + 1`; time, bits
    /// and the nonce seed come from the caller's ambient configuration.
    pub fn new(coinbase: Transaction, previous: &Block, time: u32, bits: u32, nonce: u32) -> Self {
        let mut spendable = HashMap::new();

        // Spendable set: the previous tip's coinbase outputs...
        if let Some(prev_coinbase) = previous.coinbase() {
            let txid = prev_coinbase.id();
            for (vout, output) in prev_coinbase.outputs.iter().enumerate() {
                spendable.insert((txid, vout as u32), output.recipient);
            }
        }

        // ...plus outputs of transactions in this template, coinbase included
        let coinbase_id = coinbase.id();
        for (vout, output) in coinbase.outputs.iter().enumerate() {
            spendable.insert((coinbase_id, vout as u32), output.recipient);
        }

        Self {
            previous: previous.id(),
            height: previous.header.height + 1,
            time,
            bits,
            nonce,
            target: bits_to_target(bits),
            transactions: vec![coinbase],
            spendable,
            merkle_cache: None,
        }
    }

    /// Accept a candidate transaction into the template.
    ///
    /// Rejects input-less transactions, unsigned transactions, bad
    /// signatures, spends of outputs the template does not know about,
    /// outputs already spent here, and spends not authorized by the
    /// output's recipient. On acceptance the
    /// transaction is appended and its outputs become spendable in turn.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<(), AcceptError> {
        if tx.is_coinbase() {
            return Err(AcceptError::ExtraCoinbase);
        }
        // Only the coinbase may create outputs without spending any
        if tx.inputs.is_empty() {
            return Err(AcceptError::NoInputs);
        }
        let signature = tx.signature.as_ref().ok_or(AcceptError::Unsigned)?;
        if !tx.verify_signature() {
            return Err(AcceptError::BadSignature);
        }

        // Validate every input before mutating anything
        let mut claimed: Vec<OutPoint> = Vec::with_capacity(tx.inputs.len());
        for input in &tx.inputs {
            let outpoint = (input.prev_txid, input.prev_vout);
            let txid = hex::encode(input.prev_txid);

            if claimed.contains(&outpoint) {
                return Err(AcceptError::SpentOutput {
                    txid,
                    vout: input.prev_vout,
                });
            }
            let owner = match self.spendable.get(&outpoint) {
                Some(owner) => owner,
                None => {
                    return Err(AcceptError::UnknownOutput {
                        txid,
                        vout: input.prev_vout,
                    })
                }
            };
            if *owner != signature.public_key {
                return Err(AcceptError::WrongOwner {
                    txid,
                    vout: input.prev_vout,
                });
            }
            claimed.push(outpoint);
        }

        for outpoint in claimed {
            self.spendable.remove(&outpoint);
        }
        let txid = tx.id();
        for (vout, output) in tx.outputs.iter().enumerate() {
            self.spendable.insert((txid, vout as u32), output.recipient);
        }

        debug!(
            "Accepted transaction {} into template at height {}",
            hex::encode(txid),
            self.height
        );
        self.transactions.push(tx);
        self.merkle_cache = None;
        Ok(())
    }

    /// Transactions currently in the template, coinbase first
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Template height (`previous.height + 1`)
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The expanded 256-bit proof-of-work target
    pub(crate) fn target(&self) -> &Hash256 {
        &self.target
    }

    /// Merkle root over the current transaction list.
    ///
    /// Cached between calls; invalidated by `add_transaction`, so the
    /// search recomputes it once per attempt batch rather than per step.
    pub(crate) fn merkle_root(&mut self) -> Hash256 {
        if let Some(root) = self.merkle_cache {
            return root;
        }
        let leaves: Vec<Hash256> = self.transactions.iter().map(|tx| tx.id()).collect();
        let root = merkle_root(&leaves);
        self.merkle_cache = Some(root);
        root
    }

    /// Snapshot of the header for the current (nonce, time) pair
    pub(crate) fn header(&mut self) -> Header {
        Header {
            version: BLOCK_VERSION,
            previous: self.previous,
            merkle_root: self.merkle_root(),
            time: self.time,
            bits: self.bits,
            nonce: self.nonce,
            height: self.height,
        }
    }

    /// Freeze the template into an immutable block at the current header
    pub(crate) fn freeze(&mut self) -> Block {
        Block {
            header: self.header(),
            transactions: self.transactions.clone(),
        }
    }
}
