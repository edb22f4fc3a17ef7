//! The persisted accumulator checksum registry.
//!
//! Every checksum ever published in a checkpoint maps to the full
//! accumulator value it fingerprints and the height it first appeared
//! at. The registry is written only by the block-connection path and
//! read concurrently by staking and spend construction; callers share it
//! behind a lock, and every write commits a whole checkpoint's
//! per-denomination set before readers see any of it.

use num_bigint::BigUint;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use zkas_arith::{Accumulator, GroupParams};
use zkas_common::{ChainCursor, ChecksumDigest, Denomination, ProtocolParams};

use crate::checksum::checksum;
use crate::map::AccumulatorMap;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// No record for the requested checksum/denomination pair.
    #[error("no accumulator recorded for checksum {checksum:#010x} denom {denomination:?}")]
    NotFound {
        checksum: u32,
        denomination: Denomination,
    },
    /// Height outside the valid checkpoint window.
    #[error("height {height} is outside the valid checkpoint range")]
    InvalidCheckpointRange { height: u32 },
    /// Two distinct accumulator values fingerprint to the same checksum.
    /// Fatal: the checkpoint cannot be accepted.
    #[error("checksum {checksum:#010x} for denom {denomination:?} already maps to a different value")]
    ChecksumCollision {
        checksum: u32,
        denomination: Denomination,
    },
    /// A candidate digest does not match the recomputed registry state.
    #[error("checkpoint digest mismatch at height {height}")]
    CheckpointMismatch { height: u32 },
    #[error("checksum store failure: {0}")]
    Storage(String),
}

/// Persistence contract for checksum records. `insert` is first-seen
/// only: it reports `false` without writing when the pair is already
/// present.
pub trait ChecksumStore {
    fn insert(
        &mut self,
        checksum: u32,
        denom: Denomination,
        value: &BigUint,
        height: u32,
    ) -> Result<bool, RegistryError>;

    fn get(
        &self,
        checksum: u32,
        denom: Denomination,
    ) -> Result<Option<(BigUint, u32)>, RegistryError>;

    fn erase(&mut self, checksum: u32, denom: Denomination) -> Result<bool, RegistryError>;
}

/// In-memory store, used by tests and by nodes that rebuild the registry
/// from the chain on startup.
#[derive(Default)]
pub struct MemoryChecksumStore {
    records: BTreeMap<(u32, usize), (BigUint, u32)>,
}

impl MemoryChecksumStore {
    pub fn new() -> MemoryChecksumStore {
        MemoryChecksumStore::default()
    }
}

impl ChecksumStore for MemoryChecksumStore {
    fn insert(
        &mut self,
        checksum: u32,
        denom: Denomination,
        value: &BigUint,
        height: u32,
    ) -> Result<bool, RegistryError> {
        let key = (checksum, denom.slot());
        if self.records.contains_key(&key) {
            return Ok(false);
        }
        self.records.insert(key, (value.clone(), height));
        Ok(true)
    }

    fn get(
        &self,
        checksum: u32,
        denom: Denomination,
    ) -> Result<Option<(BigUint, u32)>, RegistryError> {
        Ok(self.records.get(&(checksum, denom.slot())).cloned())
    }

    fn erase(&mut self, checksum: u32, denom: Denomination) -> Result<bool, RegistryError> {
        Ok(self.records.remove(&(checksum, denom.slot())).is_some())
    }
}

/// SQLite-backed store.
pub struct SqliteChecksumStore {
    conn: Connection,
}

impl SqliteChecksumStore {
    pub fn open(path: impl AsRef<Path>) -> Result<SqliteChecksumStore, RegistryError> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| RegistryError::Storage(format!("database open failed: {e}")))?;
        let store = SqliteChecksumStore { conn };
        store.init_schema()?;
        info!("Opened checksum store at {:?}", path.as_ref());
        Ok(store)
    }

    /// In-memory database (for testing).
    pub fn in_memory() -> Result<SqliteChecksumStore, RegistryError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| RegistryError::Storage(format!("in-memory db failed: {e}")))?;
        let store = SqliteChecksumStore { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), RegistryError> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS acc_checksums (
                    checksum INTEGER NOT NULL,
                    denom INTEGER NOT NULL,
                    value BLOB NOT NULL,
                    height INTEGER NOT NULL,
                    PRIMARY KEY (checksum, denom)
                );
                "#,
            )
            .map_err(|e| RegistryError::Storage(format!("schema init failed: {e}")))
    }
}

impl ChecksumStore for SqliteChecksumStore {
    fn insert(
        &mut self,
        checksum: u32,
        denom: Denomination,
        value: &BigUint,
        height: u32,
    ) -> Result<bool, RegistryError> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO acc_checksums (checksum, denom, value, height) VALUES (?, ?, ?, ?)",
                params![checksum, denom.slot() as i64, value.to_bytes_be(), height],
            )
            .map_err(|e| RegistryError::Storage(format!("insert checksum failed: {e}")))?;
        Ok(inserted > 0)
    }

    fn get(
        &self,
        checksum: u32,
        denom: Denomination,
    ) -> Result<Option<(BigUint, u32)>, RegistryError> {
        let result = self.conn.query_row(
            "SELECT value, height FROM acc_checksums WHERE checksum = ? AND denom = ?",
            params![checksum, denom.slot() as i64],
            |row| {
                let blob: Vec<u8> = row.get(0)?;
                let height: u32 = row.get(1)?;
                Ok((BigUint::from_bytes_be(&blob), height))
            },
        );
        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(RegistryError::Storage(format!("get checksum failed: {e}"))),
        }
    }

    fn erase(&mut self, checksum: u32, denom: Denomination) -> Result<bool, RegistryError> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM acc_checksums WHERE checksum = ? AND denom = ?",
                params![checksum, denom.slot() as i64],
            )
            .map_err(|e| RegistryError::Storage(format!("erase checksum failed: {e}")))?;
        Ok(removed > 0)
    }
}

/// The accumulator checkpoint registry.
pub struct AccumulatorRegistry {
    group: GroupParams,
    protocol: ProtocolParams,
    store: Box<dyn ChecksumStore + Send>,
}

impl AccumulatorRegistry {
    pub fn new(
        group: GroupParams,
        protocol: ProtocolParams,
        store: Box<dyn ChecksumStore + Send>,
    ) -> AccumulatorRegistry {
        AccumulatorRegistry {
            group,
            protocol,
            store,
        }
    }

    /// Registry over an in-memory store.
    pub fn in_memory(group: GroupParams, protocol: ProtocolParams) -> AccumulatorRegistry {
        AccumulatorRegistry::new(group, protocol, Box::new(MemoryChecksumStore::new()))
    }

    pub fn group(&self) -> &GroupParams {
        &self.group
    }

    pub fn protocol(&self) -> &ProtocolParams {
        &self.protocol
    }

    /// Full accumulator value and first-seen height for a checksum.
    pub fn lookup(
        &self,
        checksum: u32,
        denom: Denomination,
    ) -> Result<(BigUint, u32), RegistryError> {
        self.store
            .get(checksum, denom)?
            .ok_or(RegistryError::NotFound {
                checksum,
                denomination: denom,
            })
    }

    /// Height a checksum was first published at.
    pub fn height_of(&self, checksum: u32, denom: Denomination) -> Result<u32, RegistryError> {
        Ok(self.lookup(checksum, denom)?.1)
    }

    /// Recompute the per-denomination accumulators as of the checkpoint
    /// at `height`, resuming from the previous checkpoint's recorded
    /// values and folding the newly matured mint range.
    pub fn compute_at_height(
        &self,
        height: u32,
        chain: &dyn ChainCursor,
    ) -> Result<AccumulatorMap, RegistryError> {
        let tip = chain
            .tip_height()
            .ok_or(RegistryError::InvalidCheckpointRange { height })?;
        if height < self.protocol.first_checkpoint()
            || height > tip
            || !self.protocol.is_checkpoint_height(height)
        {
            return Err(RegistryError::InvalidCheckpointRange { height });
        }

        let prev_height = height.checked_sub(self.protocol.checkpoint_interval);
        let (mut map, fold_from) = if let Some(prev_height) =
            prev_height.filter(|h| *h >= self.protocol.first_checkpoint())
        {
            let prev_block =
                chain
                    .block_at(prev_height)
                    .ok_or(RegistryError::InvalidCheckpointRange { height })?;
            let map = self.load_checkpoint(&prev_block.checkpoint_digest)?;
            (map, self.protocol.maturity_cutoff(prev_height) + 1)
        } else {
            // First checkpoint after activation: fresh accumulators, no
            // mints can predate activation.
            (
                AccumulatorMap::initial(&self.group),
                self.protocol.activation_height,
            )
        };

        let cutoff = self.protocol.maturity_cutoff(height);
        let mut folded = 0usize;
        for walk in fold_from..=cutoff {
            for mint in chain.mints_at(walk) {
                map.accumulate(mint.denomination, &mint.value);
                folded += 1;
            }
        }
        debug!(height, cutoff, folded, "computed accumulator checkpoint");
        Ok(map)
    }

    /// Compute the checkpoint at `height`, persist every newly seen
    /// checksum, and return the composite digest for the block header.
    pub fn record_at_height(
        &mut self,
        height: u32,
        chain: &dyn ChainCursor,
    ) -> Result<ChecksumDigest, RegistryError> {
        let map = self.compute_at_height(height, chain)?;
        let digest = self.persist_map(&map, height)?;
        info!(height, digest = %digest, "recorded accumulator checkpoint");
        Ok(digest)
    }

    /// Validate a candidate block's digest against independently
    /// recomputed registry state. On a checkpoint height the digest must
    /// equal the recomputed one (and is then persisted); elsewhere it
    /// must carry the parent's digest forward unchanged.
    pub fn validate_checkpoint(
        &mut self,
        height: u32,
        claimed: &ChecksumDigest,
        chain: &dyn ChainCursor,
    ) -> Result<(), RegistryError> {
        if !self.protocol.is_checkpoint_height(height) {
            let parent = chain
                .block_at(height - 1)
                .ok_or(RegistryError::InvalidCheckpointRange { height })?;
            if *claimed != parent.checkpoint_digest {
                return Err(RegistryError::CheckpointMismatch { height });
            }
            return Ok(());
        }

        let map = self.compute_at_height(height, chain)?;
        if map.digest() != *claimed {
            warn!(height, claimed = %claimed, computed = %map.digest(),
                "accumulator checkpoint mismatch");
            return Err(RegistryError::CheckpointMismatch { height });
        }
        self.persist_map(&map, height)?;
        Ok(())
    }

    /// Rebuild an [`AccumulatorMap`] from a published digest, reading
    /// each denomination's full value back out of the store. Slots with
    /// no record fall back to the empty-set accumulator (checkpoints
    /// that predate any mint).
    pub fn load_checkpoint(
        &self,
        digest: &ChecksumDigest,
    ) -> Result<AccumulatorMap, RegistryError> {
        let mut map = AccumulatorMap::initial(&self.group);
        for denom in Denomination::ALL {
            let slot_checksum = digest.checksum_for(denom);
            if let Some((value, _)) = self.store.get(slot_checksum, denom)? {
                map.set(
                    denom,
                    Accumulator::from_value(&self.group.accumulator, value),
                );
            }
        }
        Ok(map)
    }

    /// Remove the registry entries introduced by an undone checkpoint,
    /// restoring the previous checkpoint's visible state. Idempotent:
    /// erasing an already absent entry is not an error.
    pub fn erase(
        &mut self,
        undone: &ChecksumDigest,
        previous: &ChecksumDigest,
    ) -> Result<(), RegistryError> {
        for denom in Denomination::ALL {
            let gone = undone.checksum_for(denom);
            if gone == previous.checksum_for(denom) {
                continue;
            }
            if self.store.erase(gone, denom)? {
                debug!(checksum = format!("{gone:#010x}"), ?denom, "erased checksum record");
            }
        }
        info!(undone = %undone, "rolled back accumulator checkpoint");
        Ok(())
    }

    /// Per-denomination height of the most recent checkpoint at which
    /// that denomination's accumulator last changed. A mint is
    /// stake-mature only once a checkpoint beyond this height covers it.
    pub fn mint_maturity_heights(
        &self,
        chain: &dyn ChainCursor,
    ) -> BTreeMap<Denomination, u32> {
        let mut heights = BTreeMap::new();
        let first = self.protocol.first_checkpoint();
        let Some(tip) = chain.tip_height() else {
            return heights;
        };
        let mut walk = self.protocol.checkpoint_floor(tip);
        while walk > first && heights.len() < Denomination::ALL.len() {
            let (Some(block), Some(prev)) = (
                chain.block_at(walk),
                chain.block_at(walk - self.protocol.checkpoint_interval),
            ) else {
                break;
            };
            for denom in Denomination::ALL {
                if heights.contains_key(&denom) {
                    continue;
                }
                if block.checkpoint_digest.checksum_for(denom)
                    != prev.checkpoint_digest.checksum_for(denom)
                {
                    heights.insert(denom, walk);
                }
            }
            walk -= self.protocol.checkpoint_interval;
        }
        for denom in Denomination::ALL {
            heights.entry(denom).or_insert(first);
        }
        heights
    }

    fn persist_map(
        &mut self,
        map: &AccumulatorMap,
        height: u32,
    ) -> Result<ChecksumDigest, RegistryError> {
        for (denom, accumulator) in map.iter() {
            let value = accumulator.value();
            let fingerprint = checksum(value);
            match self.store.get(fingerprint, denom)? {
                Some((existing, _)) if existing != *value => {
                    return Err(RegistryError::ChecksumCollision {
                        checksum: fingerprint,
                        denomination: denom,
                    });
                }
                Some(_) => {}
                None => {
                    self.store.insert(fingerprint, denom, value, height)?;
                }
            }
        }
        Ok(map.digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_first_seen_only() {
        let mut store = MemoryChecksumStore::new();
        let value = BigUint::from(123u32);
        assert!(store.insert(7, Denomination::One, &value, 100).unwrap());
        assert!(!store.insert(7, Denomination::One, &value, 200).unwrap());
        let (_, height) = store.get(7, Denomination::One).unwrap().unwrap();
        assert_eq!(height, 100);
    }

    #[test]
    fn sqlite_store_round_trip() {
        let mut store = SqliteChecksumStore::in_memory().unwrap();
        let value = BigUint::from(0xdead_beefu64);
        assert!(store.insert(42, Denomination::Ten, &value, 120).unwrap());
        let (back, height) = store.get(42, Denomination::Ten).unwrap().unwrap();
        assert_eq!(back, value);
        assert_eq!(height, 120);
        // same checksum, other denomination: distinct slot
        assert!(store.get(42, Denomination::One).unwrap().is_none());
        assert!(store.erase(42, Denomination::Ten).unwrap());
        assert!(!store.erase(42, Denomination::Ten).unwrap());
    }

    #[test]
    fn lookup_reports_not_found() {
        let registry =
            AccumulatorRegistry::in_memory(GroupParams::dev().clone(), ProtocolParams::default());
        assert!(matches!(
            registry.lookup(1, Denomination::One),
            Err(RegistryError::NotFound { .. })
        ));
    }
}
