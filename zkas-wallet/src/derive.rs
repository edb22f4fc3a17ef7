//! Seed-to-commitment derivation.
//!
//! `Sha512(master ∥ index)` splits into a serial seed (high half) and a
//! randomness seed (low half). The serial is fixed by its seed; only the
//! randomness is retried, with the attempt counter folded into the hash
//! input, until the Pedersen commitment is prime and in range. One
//! strategy, no alternatives: mixing search strategies would make coins
//! irreproducible from the seed.

use num_bigint::BigUint;
use sha2::{Digest, Sha256, Sha512};
use tracing::trace;

use zkas_arith::{commit, is_prime, reduce_be_bytes, GroupParams, ParamsError};
use zkas_common::Denomination;

use crate::WalletError;

/// A freshly derived coin: the full opening plus its public value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintCommitment {
    pub denomination: Denomination,
    /// Sequence index this coin was derived at.
    pub index: u32,
    pub serial: BigUint,
    pub randomness: BigUint,
    /// `g^serial * h^randomness mod p`; prime and within the coin value
    /// range.
    pub commitment: BigUint,
}

/// The 512-bit derived seed for one index. Pure; never persisted.
fn derive_seed(master: &[u8; 32], index: u32) -> [u8; 64] {
    let mut hasher = Sha512::new();
    hasher.update(master);
    hasher.update(index.to_le_bytes());
    let digest = hasher.finalize();
    let mut seed = [0u8; 64];
    seed.copy_from_slice(&digest);
    seed
}

/// Derive the (serial, randomness, commitment) opening at `index`.
///
/// Pure given `(master, index)`: calling it twice yields identical
/// output. Exhausting the attempt ceiling means the group parameters
/// cannot produce valid coins and surfaces as a fatal
/// [`ParamsError::AttemptCeiling`].
pub fn derive_opening(
    params: &GroupParams,
    master: &[u8; 32],
    index: u32,
) -> Result<(BigUint, BigUint, BigUint), WalletError> {
    let seed = derive_seed(master, index);
    let (serial_seed, randomness_seed) = seed.split_at(32);
    let order = &params.commitment.group_order;

    let serial = reduce_be_bytes(&Sha256::digest(serial_seed), order);

    let range = &params.accumulator;
    for attempt in 0..params.max_commitment_attempts {
        let mut hasher = Sha256::new();
        hasher.update(randomness_seed);
        hasher.update(attempt.to_le_bytes());
        let randomness = reduce_be_bytes(&hasher.finalize(), order);

        let commitment = commit(&params.commitment, &serial, &randomness);
        if commitment >= range.min_coin_value
            && commitment <= range.max_coin_value
            && is_prime(&commitment, params.primality_rounds)
        {
            trace!(index, attempt, "commitment search converged");
            return Ok((serial, randomness, commitment));
        }
    }
    Err(ParamsError::AttemptCeiling(params.max_commitment_attempts).into())
}

/// [`derive_opening`] packaged as a denomination-carrying coin.
pub fn derive_mint(
    params: &GroupParams,
    master: &[u8; 32],
    denomination: Denomination,
    index: u32,
) -> Result<MintCommitment, WalletError> {
    let (serial, randomness, commitment) = derive_opening(params, master, index)?;
    Ok(MintCommitment {
        denomination,
        index,
        serial,
        randomness,
        commitment,
    })
}
