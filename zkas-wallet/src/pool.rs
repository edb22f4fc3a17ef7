//! The in-memory face of the reservation pool.
//!
//! Entries map a derived commitment value to the sequence index it came
//! from. The durable copy lives in the wallet store; this mirror exists
//! so membership tests and reconciliation passes do not hit storage per
//! probe.

use std::collections::BTreeMap;

use num_bigint::BigUint;

use crate::store::WalletStore;
use crate::WalletError;

#[derive(Default)]
pub(crate) struct MintPool {
    /// commitment value (big-endian bytes) -> sequence index
    entries: BTreeMap<Vec<u8>, u32>,
}

impl MintPool {
    /// Mirror the persisted pool.
    pub fn load(store: &dyn WalletStore) -> Result<MintPool, WalletError> {
        let mut pool = MintPool::default();
        for (value, index) in store.pool_entries()? {
            pool.entries.insert(value.to_bytes_be(), index);
        }
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, value: &BigUint) -> bool {
        self.entries.contains_key(&value.to_bytes_be())
    }

    pub fn insert(&mut self, value: &BigUint, index: u32) {
        self.entries.insert(value.to_bytes_be(), index);
    }

    pub fn remove(&mut self, value: &BigUint) {
        self.entries.remove(&value.to_bytes_be());
    }

    /// Highest index any pool entry was derived at.
    pub fn max_index(&self) -> Option<u32> {
        self.entries.values().copied().max()
    }

    /// Snapshot of (value, index) pairs, lowest index first.
    pub fn snapshot(&self) -> Vec<(BigUint, u32)> {
        let mut entries: Vec<(BigUint, u32)> = self
            .entries
            .iter()
            .map(|(bytes, index)| (BigUint::from_bytes_be(bytes), *index))
            .collect();
        entries.sort_by_key(|(_, index)| *index);
        entries
    }
}
