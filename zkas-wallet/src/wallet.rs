//! The deterministic mint wallet.
//!
//! One master seed, one monotonic counter, one lock. Counter advances
//! are a serialized read-modify-persist: the new counter value is
//! durable before the derived coin leaves this module, so two racing
//! derivations can never expose the same index and a crash can only
//! waste an index, never reuse one.

use std::sync::Mutex;

use num_bigint::BigUint;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, info, warn};

use zkas_arith::GroupParams;
use zkas_common::{Denomination, MintIndex, MintRecord, ProtocolParams};

use crate::derive::{derive_mint, derive_opening, MintCommitment};
use crate::pool::MintPool;
use crate::store::WalletStore;
use crate::WalletError;

/// Deterministic mint engine plus reservation pool.
pub struct MintWallet {
    params: GroupParams,
    protocol: ProtocolParams,
    master: [u8; 32],
    state: Mutex<WalletState>,
}

struct WalletState {
    store: Box<dyn WalletStore>,
    pool: MintPool,
}

impl MintWallet {
    /// Open a wallet over `store`. On first run a master seed is drawn
    /// from the OS RNG and persisted before anything is derived from it.
    pub fn open(
        params: GroupParams,
        protocol: ProtocolParams,
        mut store: Box<dyn WalletStore>,
    ) -> Result<MintWallet, WalletError> {
        params.validate()?;
        let master = match store.master_seed()? {
            Some(seed) => seed,
            None => {
                let mut seed = [0u8; 32];
                OsRng.fill_bytes(&mut seed);
                store.set_master_seed(&seed)?;
                info!("generated new wallet master seed");
                seed
            }
        };
        let pool = MintPool::load(&*store)?;
        Ok(MintWallet {
            params,
            protocol,
            master,
            state: Mutex::new(WalletState { store, pool }),
        })
    }

    /// Replace the master seed (wallet restore). `reset_counter` rewinds
    /// the sequence counter to zero and drops the stale pool so the new
    /// seed's coins can be rediscovered from index zero.
    pub fn set_master_seed(
        &mut self,
        seed: [u8; 32],
        reset_counter: bool,
    ) -> Result<(), WalletError> {
        let state = self.state.get_mut().expect("wallet state lock poisoned");
        state.store.set_master_seed(&seed)?;
        if reset_counter {
            state.store.set_sequence_counter(0)?;
            for (value, _) in state.pool.snapshot() {
                state.store.remove_pool_entry(&value)?;
            }
            state.pool = MintPool::default();
        }
        self.master = seed;
        info!(reset_counter, "replaced wallet master seed");
        Ok(())
    }

    /// Pure derivation at an explicit index. No side effects.
    pub fn derive(
        &self,
        denomination: Denomination,
        index: u32,
    ) -> Result<MintCommitment, WalletError> {
        derive_mint(&self.params, &self.master, denomination, index)
    }

    /// Derive the next coin. The advanced counter is durable before the
    /// coin is returned; a storage failure here aborts without exposing
    /// anything.
    pub fn derive_next(&self, denomination: Denomination) -> Result<MintCommitment, WalletError> {
        let mut state = self.state.lock().expect("wallet state lock poisoned");
        let index = state.store.sequence_counter()?;
        state.store.set_sequence_counter(index + 1)?;
        drop(state);
        debug!(index, "sequence counter advanced, deriving mint");
        self.derive(denomination, index)
    }

    /// Current (next unused) sequence counter.
    pub fn sequence_counter(&self) -> Result<u32, WalletError> {
        let state = self.state.lock().expect("wallet state lock poisoned");
        state.store.sequence_counter()
    }

    /// Whether `value` is one of our not-yet-confirmed pool commitments.
    pub fn is_pool_mint(&self, value: &BigUint) -> bool {
        let state = self.state.lock().expect("wallet state lock poisoned");
        state.pool.contains(value)
    }

    /// Number of unreconciled entries currently reserved.
    pub fn pool_size(&self) -> usize {
        let state = self.state.lock().expect("wallet state lock poisoned");
        state.pool.len()
    }

    /// Top the reservation pool up to the configured lookahead.
    pub fn refill_pool(&self) -> Result<(), WalletError> {
        let mut state = self.state.lock().expect("wallet state lock poisoned");
        self.refill_locked(&mut state)
    }

    /// Record a coin of ours confirmed on chain.
    pub fn add_confirmed_mint(&self, record: &MintRecord) -> Result<(), WalletError> {
        let mut state = self.state.lock().expect("wallet state lock poisoned");
        state.store.put_mint(record)
    }

    /// All confirmed mint records.
    pub fn mints(&self) -> Result<Vec<MintRecord>, WalletError> {
        let state = self.state.lock().expect("wallet state lock poisoned");
        state.store.mints()
    }

    /// Reconcile the pool against the confirmed-mint index until a fixed
    /// point: every confirmation refills and rescans, since confirming
    /// index `i` may reveal that `i + 1` was consumed too. Returns the
    /// number of newly confirmed mints.
    ///
    /// Index lookup failures are logged and the entry stays pending;
    /// counter-persist failures abort the pass.
    pub fn reconcile(&self, mint_index: &dyn MintIndex) -> Result<u32, WalletError> {
        let mut state = self.state.lock().expect("wallet state lock poisoned");
        let mut total = 0u32;
        loop {
            self.refill_locked(&mut state)?;
            let mut confirmed = 0u32;
            for (value, index) in state.pool.snapshot() {
                let location = match mint_index.lookup(&value) {
                    Ok(Some(location)) => location,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(index, error = %e, "mint index lookup failed, leaving entry pending");
                        continue;
                    }
                };

                let (serial, randomness, commitment) =
                    derive_opening(&self.params, &self.master, index)?;
                state.store.put_mint(&MintRecord {
                    denomination: location.denomination,
                    value: commitment,
                    serial,
                    randomness,
                    height: location.height,
                    txid: location.txid,
                    used: false,
                })?;
                if state.store.sequence_counter()? <= index {
                    state.store.set_sequence_counter(index + 1)?;
                }
                state.store.remove_pool_entry(&value)?;
                state.pool.remove(&value);
                confirmed += 1;
                info!(index, height = location.height, "reconciled confirmed mint");
            }
            total += confirmed;
            if confirmed == 0 {
                break;
            }
        }
        Ok(total)
    }

    fn refill_locked(&self, state: &mut WalletState) -> Result<(), WalletError> {
        let target = self.protocol.pool_lookahead as usize;
        let counter = state.store.sequence_counter()?;
        let mut next = match state.pool.max_index() {
            Some(max) => counter.max(max + 1),
            None => counter,
        };
        while state.pool.len() < target {
            let (_, _, commitment) = derive_opening(&self.params, &self.master, next)?;
            state.store.put_pool_entry(&commitment, next)?;
            state.pool.insert(&commitment, next);
            debug!(index = next, "reserved pool commitment");
            next += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteWalletStore;

    fn small_protocol() -> ProtocolParams {
        ProtocolParams {
            pool_lookahead: 4,
            ..ProtocolParams::default()
        }
    }

    fn open_wallet() -> MintWallet {
        MintWallet::open(
            GroupParams::dev().clone(),
            small_protocol(),
            Box::new(SqliteWalletStore::in_memory().unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn first_run_generates_and_persists_a_seed() {
        let wallet = open_wallet();
        // Derivation works immediately; the seed is in place.
        wallet.derive(Denomination::One, 0).unwrap();
        assert_eq!(wallet.sequence_counter().unwrap(), 0);
    }

    #[test]
    fn derive_next_advances_the_counter() {
        let wallet = open_wallet();
        let a = wallet.derive_next(Denomination::One).unwrap();
        let b = wallet.derive_next(Denomination::One).unwrap();
        assert_eq!(a.index, 0);
        assert_eq!(b.index, 1);
        assert_ne!(a.serial, b.serial);
        assert_eq!(wallet.sequence_counter().unwrap(), 2);
    }

    #[test]
    fn refill_reserves_the_lookahead() {
        let wallet = open_wallet();
        wallet.refill_pool().unwrap();
        assert_eq!(wallet.pool_size(), 4);
        let coin = wallet.derive(Denomination::One, 0).unwrap();
        assert!(wallet.is_pool_mint(&coin.commitment));
    }

    #[test]
    fn seed_reset_clears_pool_and_counter() {
        let mut wallet = open_wallet();
        wallet.derive_next(Denomination::One).unwrap();
        wallet.refill_pool().unwrap();
        wallet.set_master_seed([0x5a; 32], true).unwrap();
        assert_eq!(wallet.sequence_counter().unwrap(), 0);
        assert_eq!(wallet.pool_size(), 0);
        let coin = wallet.derive(Denomination::One, 0).unwrap();
        let expected = derive_mint(GroupParams::dev(), &[0x5a; 32], Denomination::One, 0).unwrap();
        assert_eq!(coin, expected);
    }
}
