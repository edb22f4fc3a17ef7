//! Deterministic fixtures for zkas tests: an in-memory chain cursor, a
//! confirmed-mint index, a key store, and prime fixture coins.

use std::collections::HashMap;

use num_bigint::BigUint;

use zkas_accumulator::{AccumulatorRegistry, RegistryError};
use zkas_arith::{is_prime, GroupParams};
use zkas_common::{
    BlockHash, BlockSummary, ChainCursor, ChainMint, ChecksumDigest, Denomination, IndexError,
    KeyId, KeyStore, MintIndex, MintLocation, PubKey, TxId,
};

/// One mock block: header fields plus its confirmed mints.
#[derive(Clone, Debug)]
struct MockBlock {
    hash: BlockHash,
    time: i64,
    digest: ChecksumDigest,
    mints: Vec<ChainMint>,
    txs: Vec<TxId>,
}

/// In-memory active chain. Heights are indices into the block vector;
/// genesis sits at height 0. Reorgs are simulated by truncating and
/// re-pushing (re-pushed blocks get fresh hashes).
#[derive(Default)]
pub struct MockChain {
    blocks: Vec<MockBlock>,
    modifiers: HashMap<BlockHash, u64>,
    nonce: u64,
}

impl MockChain {
    pub fn new() -> MockChain {
        MockChain::default()
    }

    /// A chain of `height + 1` blocks with timestamps `step_secs` apart.
    pub fn with_height(height: u32, step_secs: i64) -> MockChain {
        let mut chain = MockChain::new();
        for h in 0..=height {
            chain.push_block(h as i64 * step_secs);
        }
        chain
    }

    /// Append a block at the next height.
    pub fn push_block(&mut self, time: i64) -> u32 {
        let height = self.blocks.len() as u32;
        self.nonce += 1;
        let mut hash = [0u8; 32];
        hash[..4].copy_from_slice(&height.to_le_bytes());
        hash[4..12].copy_from_slice(&self.nonce.to_le_bytes());
        hash[31] = 0xb1;
        self.blocks.push(MockBlock {
            hash: BlockHash(hash),
            time,
            digest: ChecksumDigest::ZERO,
            mints: Vec::new(),
            txs: Vec::new(),
        });
        height
    }

    /// Extend the chain with empty blocks up to `height`.
    pub fn extend_to(&mut self, height: u32, step_secs: i64) {
        let mut time = self.blocks.last().map(|b| b.time).unwrap_or(0);
        while (self.blocks.len() as u32) <= height {
            time += step_secs;
            self.push_block(time);
        }
    }

    /// Record a confirmed mint in the block at `height`; returns the
    /// synthesized confirming txid.
    pub fn push_mint(&mut self, height: u32, denomination: Denomination, value: BigUint) -> TxId {
        let block = &mut self.blocks[height as usize];
        let mut id = [0u8; 32];
        id[..4].copy_from_slice(&height.to_le_bytes());
        id[4] = block.mints.len() as u8;
        id[31] = 0x7d;
        let txid = TxId(id);
        block.mints.push(ChainMint {
            denomination,
            value,
            txid,
        });
        block.txs.push(txid);
        txid
    }

    /// Attach a non-mint transaction to a block (ledger-stake sources).
    pub fn register_tx(&mut self, height: u32, txid: TxId) {
        self.blocks[height as usize].txs.push(txid);
    }

    pub fn set_digest(&mut self, height: u32, digest: ChecksumDigest) {
        self.blocks[height as usize].digest = digest;
    }

    pub fn set_modifier(&mut self, height: u32, modifier: u64) {
        let hash = self.blocks[height as usize].hash;
        self.modifiers.insert(hash, modifier);
    }

    /// Drop every block above `height` (reorg).
    pub fn truncate_to(&mut self, height: u32) {
        self.blocks.truncate(height as usize + 1);
    }

    pub fn block_time(&self, height: u32) -> i64 {
        self.blocks[height as usize].time
    }
}

impl ChainCursor for MockChain {
    fn tip_height(&self) -> Option<u32> {
        self.blocks.len().checked_sub(1).map(|h| h as u32)
    }

    fn block_at(&self, height: u32) -> Option<BlockSummary> {
        self.blocks.get(height as usize).map(|block| BlockSummary {
            height,
            hash: block.hash,
            time: block.time,
            checkpoint_digest: block.digest,
        })
    }

    fn contains(&self, hash: &BlockHash) -> bool {
        self.blocks.iter().any(|block| block.hash == *hash)
    }

    fn block_of_tx(&self, txid: &TxId) -> Option<BlockSummary> {
        self.blocks.iter().enumerate().find_map(|(height, block)| {
            block
                .txs
                .contains(txid)
                .then(|| self.block_at(height as u32))
                .flatten()
        })
    }

    fn mints_at(&self, height: u32) -> Vec<ChainMint> {
        self.blocks
            .get(height as usize)
            .map(|block| block.mints.clone())
            .unwrap_or_default()
    }

    fn kernel_stake_modifier(&self, hash: &BlockHash) -> Option<u64> {
        self.modifiers.get(hash).copied()
    }
}

/// Record the checkpoint at `height` in the registry and publish its
/// digest into the mock chain's header, the way block connection does.
pub fn seal_checkpoint(
    chain: &mut MockChain,
    registry: &mut AccumulatorRegistry,
    height: u32,
) -> Result<ChecksumDigest, RegistryError> {
    let digest = registry.record_at_height(height, chain)?;
    chain.set_digest(height, digest);
    Ok(digest)
}

/// Seal every checkpoint height in `from..=to`.
pub fn seal_checkpoints(
    chain: &mut MockChain,
    registry: &mut AccumulatorRegistry,
    from: u32,
    to: u32,
) -> Result<(), RegistryError> {
    let interval = registry.protocol().checkpoint_interval;
    let mut height = from;
    while height <= to {
        if registry.protocol().is_checkpoint_height(height)
            && height >= registry.protocol().first_checkpoint()
        {
            seal_checkpoint(chain, registry, height)?;
        }
        height += interval;
    }
    Ok(())
}

/// Deterministic prime coin values inside the dev parameter range.
/// Distinct indices give distinct primes.
pub fn prime_coin(params: &GroupParams, index: u32) -> BigUint {
    let mut candidate =
        params.accumulator.min_coin_value.clone() + BigUint::from(10_001u32 * index + 1);
    if (&candidate % 2u32) == BigUint::from(0u32) {
        candidate += 1u32;
    }
    while !is_prime(&candidate, params.primality_rounds) {
        candidate += 2u32;
    }
    candidate
}

/// In-memory confirmed-mint index with switchable lookup failure.
#[derive(Default)]
pub struct MemoryMintIndex {
    records: HashMap<Vec<u8>, MintLocation>,
    failing: bool,
}

impl MemoryMintIndex {
    pub fn new() -> MemoryMintIndex {
        MemoryMintIndex::default()
    }

    /// Make subsequent lookups fail, simulating a node-side outage.
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }
}

impl MintIndex for MemoryMintIndex {
    fn lookup(&self, value: &BigUint) -> Result<Option<MintLocation>, IndexError> {
        if self.failing {
            return Err(IndexError::Lookup("mock index offline".into()));
        }
        Ok(self.records.get(&value.to_bytes_be()).cloned())
    }

    fn insert(&mut self, value: &BigUint, location: MintLocation) -> Result<(), IndexError> {
        self.records.insert(value.to_bytes_be(), location);
        Ok(())
    }
}

/// In-memory key store handing out deterministic fresh keys.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: HashMap<KeyId, PubKey>,
    next: u8,
}

impl MemoryKeyStore {
    pub fn new() -> MemoryKeyStore {
        MemoryKeyStore::default()
    }

    pub fn insert(&mut self, id: KeyId, key: PubKey) {
        self.keys.insert(id, key);
    }
}

impl KeyStore for MemoryKeyStore {
    fn key_for(&self, id: &KeyId) -> Option<PubKey> {
        self.keys.get(id).copied()
    }

    fn fresh_key(&mut self) -> PubKey {
        self.next += 1;
        let mut bytes = [0u8; 33];
        bytes[0] = 0x02;
        bytes[1] = self.next;
        PubKey(bytes)
    }
}
