//! Primitives shared by the alias crates.

pub mod economics;
mod params;
mod record;

use bitcoin::hashes::{hash160, Hash};
use bitcoin::{Block, OutPoint, ScriptBuf, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use economics::FeeWindow;
pub use params::AliasParams;
pub use record::{FeeSample, NameHistory, NameIndexRecord};

pub const COIN: u64 = 100_000_000;

pub const CENT: u64 = 1_000_000;

/// Transaction version marking a transaction as alias-tagged.
pub const ALIAS_TX_VERSION: i32 = 0x7400;

/// Height attributed to coins that are not confirmed yet.
pub const MEMPOOL_HEIGHT: u32 = 0x7FFF_FFFF;

/// Length of the `New` commitment and the upper bound of the reveal random.
pub const COMMITMENT_LENGTH: usize = 20;

pub const MAX_NAME_LENGTH: usize = 255;

pub const MAX_VALUE_LENGTH: usize = 1023;

/// Minimum number of blocks a `New` must be buried before its `FirstUpdate`.
pub const MIN_FIRST_UPDATE_DEPTH: u32 = 12;

/// Returns `true` if `tx` carries the alias transaction version.
pub fn is_alias_tx(tx: &Transaction) -> bool {
    tx.version.0 == ALIAS_TX_VERSION
}

/// Computes the `New` commitment `hash160(rand || name)`.
pub fn commitment(rand: &[u8], name: &[u8]) -> [u8; COMMITMENT_LENGTH] {
    let mut preimage = Vec::with_capacity(rand.len() + name.len());
    preimage.extend_from_slice(rand);
    preimage.extend_from_slice(name);
    hash160::Hash::hash(&preimage).to_byte_array()
}

/// Unspent output as seen by alias validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Whether the coin is from a coinbase transaction.
    pub is_coinbase: bool,
    /// Transfer value in satoshis.
    pub amount: u64,
    /// Block height at which the coin was created, [`MEMPOOL_HEIGHT`] if unconfirmed.
    pub height: u32,
    /// Spending condition of the output.
    pub script_pubkey: ScriptBuf,
}

/// Read access to spent outputs, provided by the ledger engine.
pub trait CoinView {
    /// Returns the coin at `outpoint`, if it is known and unspent.
    fn coin(&self, outpoint: &OutPoint) -> Option<Coin>;
}

impl CoinView for HashMap<OutPoint, Coin> {
    fn coin(&self, outpoint: &OutPoint) -> Option<Coin> {
        self.get(outpoint).cloned()
    }
}

impl<T: CoinView + ?Sized> CoinView for &T {
    fn coin(&self, outpoint: &OutPoint) -> Option<Coin> {
        (**self).coin(outpoint)
    }
}

/// Access to the best chain by height, used to replay blocks.
pub trait BlockSource {
    /// Height of the current best block.
    fn tip_height(&self) -> u32;

    /// Returns the best-chain block at `height`.
    fn block_at(&self, height: u32) -> Option<Block>;
}
