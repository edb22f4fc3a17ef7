//! Minimal script and transaction types for stake assembly.
//!
//! Only the shapes the stake-input abstraction needs: single-key output
//! scripts, outpoints, and the two input forms (outpoint spend and
//! zero-knowledge spend). Full transaction construction lives with the
//! wallet collaborator.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::denomination::Denomination;
use crate::ids::TxId;
use crate::CoinAmount;

/// Compressed public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKey(#[serde(with = "serde_bytes_33")] pub [u8; 33]);

/// Hash160 key identifier, the payee of a pay-to-address script.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyId(pub [u8; 20]);

/// Output script forms the staking path understands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptPubKey {
    /// Direct pay-to-public-key.
    PayToPubkey(PubKey),
    /// Pay-to-address; resolvable to a key through the wallet key store.
    PayToPubkeyHash(KeyId),
    /// Anything else. Unsupported as stake kernel material.
    Raw(Vec<u8>),
}

/// Wallet key management, an external collaborator.
pub trait KeyStore {
    /// Resolve a pay-to-address payee to its full public key.
    fn key_for(&self, id: &KeyId) -> Option<PubKey>;

    /// Allocate a fresh key for a stake output.
    fn fresh_key(&mut self) -> PubKey;
}

/// Reference to a transaction output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: TxId,
    pub vout: u32,
}

/// A transaction output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: CoinAmount,
    pub script: ScriptPubKey,
}

/// Light view of a source transaction: its id and outputs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTx {
    pub txid: TxId,
    pub outputs: Vec<TxOut>,
}

/// Serialized zero-knowledge spend carried by a transaction input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkSpend {
    pub denomination: Denomination,
    #[serde(with = "zkas_arith::params::serde_biguint")]
    pub serial: BigUint,
    /// Accumulator checksum the spend proof was built against.
    pub checksum: u32,
    /// Opaque proof bytes produced by the spend constructor.
    pub proof: Vec<u8>,
}

/// A transaction input in one of the two supported forms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxIn {
    Outpoint(OutPoint),
    ZkSpend(ZkSpend),
}

mod serde_bytes_33 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 33], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 33], D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        let decoded = hex::decode(&text).map_err(de::Error::custom)?;
        decoded
            .try_into()
            .map_err(|_| de::Error::custom("expected 33 bytes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_serde_round_trip() {
        let script = ScriptPubKey::PayToPubkey(PubKey([7u8; 33]));
        let json = serde_json::to_string(&script).unwrap();
        let back: ScriptPubKey = serde_json::from_str(&json).unwrap();
        assert_eq!(script, back);
    }

    #[test]
    fn zk_spend_serde_round_trip() {
        let spend = ZkSpend {
            denomination: Denomination::Ten,
            serial: BigUint::from(123_456_789u64),
            checksum: 0xfeed_f00d,
            proof: vec![1, 2, 3],
        };
        let json = serde_json::to_string(&spend).unwrap();
        let back: ZkSpend = serde_json::from_str(&json).unwrap();
        assert_eq!(spend, back);
    }
}
