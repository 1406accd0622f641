//! Proof-of-work search over a block template
//!
//! The miner owns its template exclusively for the duration of a search.
//! Each `step` serializes the header for the current (nonce, time) pair,
//! hashes it and compares against the target expanded from `bits`; `run`
//! drives stepping to completion and yields the mined block exactly once.
//! When the nonce space wraps, the timestamp advances one second and the
//! nonce restarts, so the search never stalls.

use crate::core::block::Block;
use crate::core::transaction::Transaction;
use crate::crypto::hash_meets_target;
use crate::mining::template::{AcceptError, BlockTemplate};
use log::{debug, info};
use std::time::Instant;
use thiserror::Error;

/// Mining errors surfaced to the driver
#[derive(Error, Debug)]
pub enum MinerError {
    #[error("Unacceptable transaction: {0}")]
    UnacceptableTransaction(#[from] AcceptError),
    #[error("Invalid tip {id}: block does not satisfy its declared proof of work")]
    InvalidTip { id: String },
    #[error("Search already finished; the template is frozen")]
    SearchFinished,
}

/// Search state; `Found` is terminal for a given template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinerState {
    Idle,
    Searching,
    Found,
}

/// Mining configuration.
///
/// A plain value type: cloning yields an independent configuration, so no
/// state leaks between mining attempts. The nonce seed defaults to zero.
#[derive(Debug, Clone)]
pub struct MinerConfig {
    /// Reward transaction, placed first in the template
    pub coinbase: Transaction,
    /// Block the new template extends
    pub previous: Block,
    /// Template timestamp (unix seconds)
    pub time: u32,
    /// Compact proof-of-work target
    pub bits: u32,
    /// Nonce seed the search starts from
    pub nonce: u32,
}

impl MinerConfig {
    pub fn new(coinbase: Transaction, previous: Block, time: u32, bits: u32) -> Self {
        Self {
            coinbase,
            previous,
            time,
            bits,
            nonce: 0,
        }
    }

    /// Start the search from a known-good nonce seed
    pub fn with_nonce(mut self, nonce: u32) -> Self {
        self.nonce = nonce;
        self
    }
}

/// Single-worker proof-of-work miner
pub struct Miner {
    config: MinerConfig,
    template: BlockTemplate,
    state: MinerState,
    result: Option<Block>,
    attempts: u64,
}

impl Miner {
    /// Create a miner with a fresh template for the configured tip
    pub fn new(config: MinerConfig) -> Self {
        let template = BlockTemplate::new(
            config.coinbase.clone(),
            &config.previous,
            config.time,
            config.bits,
            config.nonce,
        );
        Self {
            config,
            template,
            state: MinerState::Idle,
            result: None,
            attempts: 0,
        }
    }

    /// Current search state
    pub fn state(&self) -> MinerState {
        self.state
    }

    /// Nonce the next attempt will hash with
    pub fn nonce(&self) -> u32 {
        self.template.nonce
    }

    /// Timestamp the next attempt will hash with
    pub fn time(&self) -> u32 {
        self.template.time
    }

    /// Total hash attempts across all searches of this miner
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Transactions currently in the template, coinbase first
    pub fn transactions(&self) -> &[Transaction] {
        self.template.transactions()
    }

    /// Add a candidate transaction to the template.
    ///
    /// Must not be interleaved with a concurrent `run` (the `&mut self`
    /// receiver enforces this); once a block has been found the transaction
    /// set is frozen and this fails with [`MinerError::SearchFinished`].
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<(), MinerError> {
        if self.state == MinerState::Found {
            return Err(MinerError::SearchFinished);
        }
        self.template.add_transaction(tx)?;
        Ok(())
    }

    /// Perform a single proof-of-work attempt.
    ///
    /// Hashes the header at the current (nonce, time) pair. On success the
    /// template freezes into an immutable block and the search is over; on
    /// failure the nonce advances, rolling the timestamp forward one second
    /// when the nonce space wraps. Stepping has no other observable effect
    /// on the template, so callers may drive it freely before adding
    /// transactions.
    pub fn step(&mut self) -> Option<&Block> {
        if self.state == MinerState::Found {
            return self.result.as_ref();
        }
        self.state = MinerState::Searching;
        self.attempts += 1;

        let header = self.template.header();
        if hash_meets_target(&header.id(), self.template.target()) {
            let block = self.template.freeze();
            info!(
                "Block {} found at height {} (nonce {}, time {})",
                block.id_hex(),
                block.header.height,
                block.header.nonce,
                block.header.time
            );
            self.state = MinerState::Found;
            self.result = Some(block);
            return self.result.as_ref();
        }

        match self.template.nonce.checked_add(1) {
            Some(next) => self.template.nonce = next,
            None => {
                // Nonce space exhausted under this timestamp
                self.template.time = self.template.time.wrapping_add(1);
                self.template.nonce = 0;
            }
        }
        None
    }

    /// Drive the search to completion and yield the mined block.
    ///
    /// Completion is signaled exactly once per search as the `Ok` return;
    /// calling `run` again on a finished miner re-yields the same block
    /// without mining anything.
    pub fn run(&mut self) -> Result<Block, MinerError> {
        if let Some(block) = &self.result {
            return Ok(block.clone());
        }

        let start = Instant::now();
        let before = self.attempts;

        let block = loop {
            if let Some(found) = self.step() {
                break found.clone();
            }
        };

        let attempts = self.attempts - before;
        let elapsed = start.elapsed().as_millis();
        let hash_rate = if elapsed > 0 {
            attempts as f64 / (elapsed as f64 / 1000.0)
        } else {
            attempts as f64
        };
        info!(
            "Mined block {} in {}ms ({} attempts, {:.2} H/s)",
            block.header.height, elapsed, attempts, hash_rate
        );

        Ok(block)
    }

    /// Extend the chain: adopt a freshly mined block as the new tip and
    /// rebuild the template on top of it with the next coinbase.
    ///
    /// The supplied block's proof of work is re-checked, never trusted.
    /// Time, bits and the nonce seed carry over from the miner's ambient
    /// configuration.
    pub fn new_tip(&mut self, mined: Block, next_coinbase: Transaction) -> Result<(), MinerError> {
        if !mined.header.valid_proof_of_work() {
            return Err(MinerError::InvalidTip { id: mined.id_hex() });
        }

        debug!(
            "New tip {} at height {}",
            mined.id_hex(),
            mined.header.height
        );
        self.template = BlockTemplate::new(
            next_coinbase.clone(),
            &mined,
            self.config.time,
            self.config.bits,
            self.config.nonce,
        );
        self.config.coinbase = next_coinbase;
        self.config.previous = mined;
        self.state = MinerState::Idle;
        self.result = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    const TIME: u32 = 1_432_594_281;
    /// Roughly 2^12 expected attempts
    const EASY_BITS: u32 = 0x1f0fffff;
    /// Roughly 2^20 expected attempts
    const HARD_BITS: u32 = 0x1e0fffff;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn coinbase_for(key: &KeyPair, extra: u32) -> Transaction {
        Transaction::new()
            .coinbase_at(0, extra)
            .to(key.public_key_bytes())
    }

    fn genesis_config(key: &KeyPair, bits: u32) -> MinerConfig {
        MinerConfig::new(coinbase_for(key, 1), Block::genesis(), TIME, bits)
    }

    #[test]
    fn test_scenario_a_first_block_from_genesis() {
        init_logger();
        let key = KeyPair::generate();
        let mut miner = Miner::new(genesis_config(&key, HARD_BITS));

        let block = miner.run().unwrap();
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(block.header.height, 1);
        assert_eq!(block.header.previous, Block::genesis().id());
        assert!(block.header.valid_proof_of_work());
        assert!(block.validate().is_ok());
    }

    #[test]
    fn test_scenario_b_block_with_spend_of_previous_coinbase() {
        init_logger();
        let key = KeyPair::generate();
        let mut miner = Miner::new(genesis_config(&key, EASY_BITS));
        let tip = miner.run().unwrap();

        // Next template spends the freshly mined tip's coinbase
        let next_coinbase = coinbase_for(&key, 2);
        miner.new_tip(tip.clone(), next_coinbase).unwrap();

        let tx = Transaction::new()
            .spend(&tip.transactions[0], 0)
            .to(key.public_key_bytes())
            .colored(0x00ff00ff)
            .sign(&key)
            .unwrap();
        miner.add_transaction(tx).unwrap();

        let block = miner.run().unwrap();
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.header.height, 2);
        assert!(block.validate().is_ok());
    }

    #[test]
    fn test_scenario_c_sequential_chain() {
        init_logger();
        let key = KeyPair::generate();
        let mut miner = Miner::new(genesis_config(&key, EASY_BITS));

        let mut previous_id = Block::genesis().id();
        for height in 1..=5u32 {
            let block = miner.run().unwrap();
            assert_eq!(block.header.height, height);
            assert_eq!(block.header.previous, previous_id);
            assert!(block.validate().is_ok());

            previous_id = block.id();
            miner
                .new_tip(block, coinbase_for(&key, height + 1))
                .unwrap();
        }
    }

    #[test]
    fn test_scenario_d_color_tag_survives_block_roundtrip() {
        init_logger();
        let key = KeyPair::generate();
        let mut miner = Miner::new(genesis_config(&key, EASY_BITS));
        let tip = miner.run().unwrap();

        miner.new_tip(tip.clone(), coinbase_for(&key, 2)).unwrap();
        let tx = Transaction::new()
            .spend(&tip.transactions[0], 0)
            .to(key.public_key_bytes())
            .colored(0xff0000ff)
            .sign(&key)
            .unwrap();
        miner.add_transaction(tx).unwrap();

        let block = miner.run().unwrap();
        let decoded = Block::decode(&block.encode()).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.transactions[1].outputs[0].color, Some(0xff0000ff));
    }

    #[test]
    fn test_scenario_e_warmup_steps_before_transactions() {
        init_logger();
        let key = KeyPair::generate();
        let mut miner = Miner::new(genesis_config(&key, EASY_BITS));
        let tip = miner.run().unwrap();

        miner.new_tip(tip.clone(), coinbase_for(&key, 2)).unwrap();

        // Warm up the search before the transaction set is final
        for _ in 0..100 {
            if miner.step().is_some() {
                break;
            }
        }
        // Stepping advanced only the search position
        assert_eq!(miner.transactions().len(), 1);

        if miner.state() != MinerState::Found {
            let tx = Transaction::new()
                .spend(&tip.transactions[0], 0)
                .to(key.public_key_bytes())
                .sign(&key)
                .unwrap();
            miner.add_transaction(tx).unwrap();

            let block = miner.run().unwrap();
            assert_eq!(block.transactions.len(), 2);
            assert!(block.validate().is_ok());
        }
    }

    #[test]
    fn test_rerun_yields_same_block_without_remining() {
        init_logger();
        let key = KeyPair::generate();
        let mut miner = Miner::new(genesis_config(&key, EASY_BITS));

        let first = miner.run().unwrap();
        let attempts = miner.attempts();

        let second = miner.run().unwrap();
        assert_eq!(first, second);
        assert_eq!(miner.attempts(), attempts);
    }

    #[test]
    fn test_state_transitions() {
        let key = KeyPair::generate();
        // A zero target is unsatisfiable, keeping the search in flight
        let mut miner = Miner::new(genesis_config(&key, 0x00000000));
        assert_eq!(miner.state(), MinerState::Idle);

        assert!(miner.step().is_none());
        assert_eq!(miner.state(), MinerState::Searching);

        let mut miner = Miner::new(genesis_config(&key, EASY_BITS));
        miner.run().unwrap();
        assert_eq!(miner.state(), MinerState::Found);
    }

    #[test]
    fn test_nonce_wraparound_rolls_time_forward() {
        let key = KeyPair::generate();
        let config = genesis_config(&key, 0x00000000).with_nonce(u32::MAX);
        let mut miner = Miner::new(config);
        assert_eq!(miner.nonce(), u32::MAX);
        assert_eq!(miner.time(), TIME);

        assert!(miner.step().is_none());
        assert_eq!(miner.nonce(), 0);
        assert_eq!(miner.time(), TIME + 1);

        assert!(miner.step().is_none());
        assert_eq!(miner.nonce(), 1);
        assert_eq!(miner.time(), TIME + 1);
    }

    #[test]
    fn test_nonce_seed_is_honored() {
        let key = KeyPair::generate();
        let config = genesis_config(&key, 0x00000000).with_nonce(712);
        let mut miner = Miner::new(config);
        assert_eq!(miner.nonce(), 712);
        miner.step();
        assert_eq!(miner.nonce(), 713);
    }

    #[test]
    fn test_new_tip_rejects_bogus_proof_of_work() {
        init_logger();
        let key = KeyPair::generate();
        let mut miner = Miner::new(genesis_config(&key, EASY_BITS));
        let mut block = miner.run().unwrap();

        block.header.nonce = block.header.nonce.wrapping_add(1);
        let err = miner.new_tip(block, coinbase_for(&key, 2)).unwrap_err();
        assert!(matches!(err, MinerError::InvalidTip { .. }));
    }

    #[test]
    fn test_add_transaction_after_found_fails() {
        init_logger();
        let key = KeyPair::generate();
        let mut miner = Miner::new(genesis_config(&key, EASY_BITS));
        let tip = miner.run().unwrap();

        let tx = Transaction::new()
            .spend(&tip.transactions[0], 0)
            .to(key.public_key_bytes())
            .sign(&key)
            .unwrap();
        let err = miner.add_transaction(tx).unwrap_err();
        assert!(matches!(err, MinerError::SearchFinished));
    }

    #[test]
    fn test_unacceptable_transaction_is_distinguishable() {
        init_logger();
        let key = KeyPair::generate();
        let mut miner = Miner::new(genesis_config(&key, EASY_BITS));

        let orphan = Transaction::new()
            .coinbase_at(9, 9)
            .to(key.public_key_bytes());
        let tx = Transaction::new()
            .spend(&orphan, 0)
            .to(key.public_key_bytes())
            .sign(&key)
            .unwrap();
        let err = miner.add_transaction(tx).unwrap_err();
        assert!(matches!(
            err,
            MinerError::UnacceptableTransaction(AcceptError::UnknownOutput { .. })
        ));
    }

    #[test]
    fn test_config_clone_is_value_based() {
        let key = KeyPair::generate();
        let config = genesis_config(&key, EASY_BITS);
        let mut clone = config.clone();
        clone.time += 100;
        clone.coinbase = coinbase_for(&key, 99);

        assert_eq!(config.time, TIME);
        assert_eq!(config.coinbase, coinbase_for(&key, 1));
    }
}
