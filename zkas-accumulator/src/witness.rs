//! Membership-witness construction.
//!
//! A witness proves a coin sits in a checkpoint's accumulator without
//! revealing which member it is. Construction replays the confirmed
//! mint stream from a start checkpoint that predates the coin's
//! accumulation up to the target checkpoint, folding every foreign
//! same-denomination mint. The start offset is randomized by the
//! security level so the witness's apparent sample size does not betray
//! the true mint height.

use std::sync::atomic::{AtomicBool, Ordering};

use num_bigint::BigUint;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use zkas_arith::{Accumulator, AccumulatorWitness};
use zkas_common::{ChainCursor, Denomination, TxId};

use crate::registry::{AccumulatorRegistry, RegistryError};

/// Security level meaning "fold the entire anonymity set".
pub const MAX_SECURITY_LEVEL: u32 = 100;

/// Upper bound on the random extra checkpoints mixed into the start
/// offset at intermediate security levels.
const SECURITY_LEVEL_JITTER: u32 = 10;

#[derive(Debug, Error)]
pub enum WitnessError {
    #[error("height {height} is outside the valid checkpoint range")]
    InvalidCheckpointRange { height: u32 },
    /// The walk reached the checkpoint with too few foreign mints.
    /// Recoverable: wait for more chain and retry.
    #[error("anonymity set too small: folded {found} mints, need {required}")]
    InsufficientAnonymitySet { found: u32, required: u32 },
    /// The finished witness does not reproduce the registered
    /// accumulator value. Fatal internal inconsistency.
    #[error("witness does not reproduce the checkpoint accumulator")]
    WitnessMismatch,
    /// The chain mutated (or the caller cancelled) mid-walk. Restart
    /// from a still-valid checkpoint.
    #[error("witness build invalidated by chain movement or cancellation")]
    Invalidated,
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Everything needed to build and carry one coin's witness. Owns its
/// accumulator snapshot and witness exclusively for the duration of one
/// build-and-verify cycle; never persisted.
#[derive(Clone, Debug)]
pub struct CoinWitnessData {
    /// The coin's public commitment value.
    pub coin_value: BigUint,
    pub denomination: Denomination,
    /// Transaction the coin was minted in.
    pub txid: TxId,
    /// Confirming height, when the wallet knows it.
    pub mint_height: Option<u32>,
    /// Accumulator checksum recorded with the coin at mint time; the
    /// fallback start anchor when the mint height is unknown.
    pub checksum: Option<u32>,
    /// Legacy-format coins carry no usable checksum and start from the
    /// activation checkpoint.
    pub is_legacy: bool,

    /// Checkpoint accumulator the witness was verified against.
    pub accumulator: Option<Accumulator>,
    pub witness: Option<AccumulatorWitness>,
    /// Target checkpoint height of the last successful build.
    pub checkpoint_height: Option<u32>,
    /// Checkpoint the walk started from.
    pub start_height: Option<u32>,
    /// Foreign mints folded into the witness.
    pub mints_added: u32,
}

impl CoinWitnessData {
    pub fn new(coin_value: BigUint, denomination: Denomination, txid: TxId) -> CoinWitnessData {
        CoinWitnessData {
            coin_value,
            denomination,
            txid,
            mint_height: None,
            checksum: None,
            is_legacy: false,
            accumulator: None,
            witness: None,
            checkpoint_height: None,
            start_height: None,
            mints_added: 0,
        }
    }

    pub fn with_mint_height(mut self, height: u32) -> CoinWitnessData {
        self.mint_height = Some(height);
        self
    }

    pub fn with_checksum(mut self, checksum: u32) -> CoinWitnessData {
        self.checksum = Some(checksum);
        self
    }

    pub fn legacy(mut self) -> CoinWitnessData {
        self.is_legacy = true;
        self
    }
}

/// Randomize the effective security level so an observer cannot read
/// the true mint height off the witness's sample size. Level 0 (floor
/// only) and levels at or above [`MAX_SECURITY_LEVEL`] pass through
/// unchanged.
pub fn randomize_security_level(level: u32) -> u32 {
    if level == 0 || level >= MAX_SECURITY_LEVEL {
        level
    } else {
        level + rand::thread_rng().gen_range(0..=SECURITY_LEVEL_JITTER)
    }
}

/// Build a witness for every coin in `coins` against the checkpoint at
/// `checkpoint_height`, mutating each entry in place.
///
/// Long-running: the walk touches every block between the start and the
/// checkpoint. `cancel` aborts between blocks; an abort or any chain
/// movement surfaces as [`WitnessError::Invalidated`] and leaves no
/// partial state worth keeping.
pub fn build_witnesses(
    registry: &AccumulatorRegistry,
    chain: &dyn ChainCursor,
    coins: &mut [CoinWitnessData],
    checkpoint_height: u32,
    security_level: u32,
    cancel: Option<&AtomicBool>,
) -> Result<(), WitnessError> {
    let protocol = registry.protocol();
    let tip = chain.tip_height().ok_or(WitnessError::Invalidated)?;
    if checkpoint_height < protocol.first_checkpoint()
        || checkpoint_height > tip
        || !protocol.is_checkpoint_height(checkpoint_height)
    {
        return Err(WitnessError::InvalidCheckpointRange {
            height: checkpoint_height,
        });
    }
    let checkpoint_block = chain
        .block_at(checkpoint_height)
        .ok_or(WitnessError::Invalidated)?;
    let target_cutoff = protocol.maturity_cutoff(checkpoint_height);
    let level = randomize_security_level(security_level);
    let required = protocol.min_anonymity_set
        + if security_level >= MAX_SECURITY_LEVEL {
            0
        } else {
            security_level
        };

    for coin in coins.iter_mut() {
        // Step back far enough that the start snapshot cannot contain
        // the coin, then further by the randomized security offset.
        let base_start = resolve_start(registry, coin, checkpoint_height, target_cutoff)?;
        let start = if security_level >= MAX_SECURITY_LEVEL {
            protocol.first_checkpoint()
        } else {
            base_start
                .saturating_sub(level * protocol.checkpoint_interval)
                .max(protocol.first_checkpoint())
        };

        let snapshot = snapshot_at(registry, chain, start, coin.denomination)?;
        let mut witness = AccumulatorWitness::new(snapshot, coin.coin_value.clone());
        let mut mints_added = 0u32;

        let start_cutoff = protocol.maturity_cutoff(start);
        for walk in (start_cutoff + 1)..=target_cutoff {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                warn!(txid = %coin.txid, "witness build cancelled");
                return Err(WitnessError::Invalidated);
            }
            // Reorg guard: the checkpoint we are proving against must
            // stay on the active chain for the whole walk.
            let moved = match chain.block_at(checkpoint_height) {
                Some(block) => block.hash != checkpoint_block.hash,
                None => true,
            };
            if moved || chain.block_at(walk).is_none() {
                warn!(height = walk, "chain moved during witness build");
                return Err(WitnessError::Invalidated);
            }
            for mint in chain.mints_at(walk) {
                if mint.denomination != coin.denomination {
                    continue;
                }
                if witness.fold(&mint.value) {
                    mints_added += 1;
                }
            }
        }

        if mints_added < required {
            return Err(WitnessError::InsufficientAnonymitySet {
                found: mints_added,
                required,
            });
        }

        let target_checksum = checkpoint_block
            .checkpoint_digest
            .checksum_for(coin.denomination);
        let (target_value, _) = registry.lookup(target_checksum, coin.denomination)?;
        let target =
            Accumulator::from_value(&registry.group().accumulator, target_value);
        if !witness.verify(&target) {
            return Err(WitnessError::WitnessMismatch);
        }

        debug!(txid = %coin.txid, start, checkpoint_height, mints_added,
            "witness built");
        coin.witness = Some(witness);
        coin.accumulator = Some(target);
        coin.checkpoint_height = Some(checkpoint_height);
        coin.start_height = Some(start);
        coin.mints_added = mints_added;
    }
    Ok(())
}

/// The latest checkpoint whose maturity cutoff excludes the coin.
fn resolve_start(
    registry: &AccumulatorRegistry,
    coin: &CoinWitnessData,
    checkpoint_height: u32,
    target_cutoff: u32,
) -> Result<u32, WitnessError> {
    let protocol = registry.protocol();
    if coin.is_legacy {
        return Ok(protocol.first_checkpoint());
    }
    if let Some(mint_height) = coin.mint_height {
        if mint_height > target_cutoff {
            // Not yet matured into this checkpoint.
            return Err(WitnessError::InvalidCheckpointRange {
                height: checkpoint_height,
            });
        }
        let start = protocol
            .checkpoint_floor((mint_height + protocol.mint_maturity).saturating_sub(1))
            .max(protocol.first_checkpoint());
        return Ok(start);
    }
    if let Some(checksum) = coin.checksum {
        let height = registry.height_of(checksum, coin.denomination)?;
        if height < protocol.first_checkpoint() {
            return Err(WitnessError::InvalidCheckpointRange { height });
        }
        return Ok(height);
    }
    Ok(protocol.first_checkpoint())
}

/// Accumulator snapshot at a start checkpoint; empty-set value when the
/// checkpoint predates any recorded mint for the denomination.
fn snapshot_at(
    registry: &AccumulatorRegistry,
    chain: &dyn ChainCursor,
    start: u32,
    denom: Denomination,
) -> Result<Accumulator, WitnessError> {
    let block = chain.block_at(start).ok_or(WitnessError::Invalidated)?;
    let fingerprint = block.checkpoint_digest.checksum_for(denom);
    let params = &registry.group().accumulator;
    match registry.lookup(fingerprint, denom) {
        Ok((value, _)) => Ok(Accumulator::from_value(params, value)),
        Err(RegistryError::NotFound { .. }) => Ok(Accumulator::initial(params)),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_level_passthrough_at_bounds() {
        assert_eq!(randomize_security_level(0), 0);
        assert_eq!(randomize_security_level(MAX_SECURITY_LEVEL), MAX_SECURITY_LEVEL);
        assert_eq!(randomize_security_level(250), 250);
    }

    #[test]
    fn security_level_jitter_is_bounded() {
        for _ in 0..50 {
            let level = randomize_security_level(3);
            assert!((3..=3 + SECURITY_LEVEL_JITTER).contains(&level));
        }
    }

    #[test]
    fn builder_presets() {
        let coin = CoinWitnessData::new(BigUint::from(7u32), Denomination::One, TxId::ZERO)
            .with_mint_height(150)
            .with_checksum(9);
        assert_eq!(coin.mint_height, Some(150));
        assert_eq!(coin.checksum, Some(9));
        assert!(!coin.is_legacy);
        assert!(coin.witness.is_none());
    }
}
