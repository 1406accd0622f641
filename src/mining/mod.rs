//! Block assembly and proof-of-work search
//!
//! [`BlockTemplate`] holds the mutable pre-proof-of-work block state and
//! gates which transactions get in; [`Miner`] drives the nonce search over
//! a template and extends the chain tip by tip.

pub mod miner;
pub mod template;

pub use miner::{Miner, MinerConfig, MinerError, MinerState};
pub use template::{AcceptError, BlockTemplate};
