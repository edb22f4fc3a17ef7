//! Confirmed-mint records shared between the wallet and the staking path.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use zkas_arith::params::serde_biguint;

use crate::denomination::Denomination;
use crate::ids::TxId;

/// A coin of ours confirmed on chain, with its full opening. Persisted
/// by the wallet store once a reservation-pool entry is matched against
/// the confirmed-mint index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRecord {
    pub denomination: Denomination,
    /// Public commitment value.
    #[serde(with = "serde_biguint")]
    pub value: BigUint,
    #[serde(with = "serde_biguint")]
    pub serial: BigUint,
    #[serde(with = "serde_biguint")]
    pub randomness: BigUint,
    /// Confirming block height.
    pub height: u32,
    /// Confirming transaction.
    pub txid: TxId,
    /// Set once the coin has been spent or staked.
    pub used: bool,
}
