//! Interfaces to the external chain collaborators.
//!
//! The core never walks the ledger itself; it consumes a [`ChainCursor`]
//! for height/hash lookups and a [`MintIndex`] for confirmed-mint
//! existence tests. Both are implemented by the node, and by the mock
//! chain in `zkas-test-fixtures` for tests.

use num_bigint::BigUint;
use thiserror::Error;

use crate::checksum::ChecksumDigest;
use crate::denomination::Denomination;
use crate::ids::{BlockHash, TxId};

/// Header-level view of one block on the active chain.
#[derive(Clone, Debug)]
pub struct BlockSummary {
    pub height: u32,
    pub hash: BlockHash,
    /// Block timestamp, seconds since the epoch.
    pub time: i64,
    /// Composite accumulator checksum digest carried by this header.
    pub checkpoint_digest: ChecksumDigest,
}

/// A confirmed mint as recorded on chain.
#[derive(Clone, Debug)]
pub struct ChainMint {
    pub denomination: Denomination,
    /// The coin's public commitment value.
    pub value: BigUint,
    pub txid: TxId,
}

/// Read-only cursor over the active chain.
pub trait ChainCursor {
    /// Height of the current tip, `None` before genesis.
    fn tip_height(&self) -> Option<u32>;

    /// The active-chain block at `height`, if one exists.
    fn block_at(&self, height: u32) -> Option<BlockSummary>;

    /// Whether `hash` is on the active chain.
    fn contains(&self, hash: &BlockHash) -> bool;

    /// The block confirming `txid`, if it is on the active chain.
    fn block_of_tx(&self, txid: &TxId) -> Option<BlockSummary>;

    /// All confirmed mints in the block at `height`.
    fn mints_at(&self, height: u32) -> Vec<ChainMint>;

    /// The chain's running proof-of-stake modifier at `hash`.
    fn kernel_stake_modifier(&self, hash: &BlockHash) -> Option<u64>;
}

/// Where a confirmed mint landed on chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintLocation {
    pub txid: TxId,
    pub denomination: Denomination,
    pub height: u32,
}

/// Mint-index lookups can fail transiently (the index lives with the
/// node); such failures are reported, not fatal.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("mint index lookup failed: {0}")]
    Lookup(String),
}

/// Existence index over confirmed mints, keyed by coin public value.
pub trait MintIndex {
    fn lookup(&self, value: &BigUint) -> Result<Option<MintLocation>, IndexError>;
    fn insert(&mut self, value: &BigUint, location: MintLocation) -> Result<(), IndexError>;
}
