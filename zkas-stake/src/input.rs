//! The two stake-input variants and their shared capability surface.

use num_bigint::BigUint;
use tracing::debug;

use zkas_accumulator::AccumulatorRegistry;
use zkas_common::{
    BlockSummary, ChainCursor, CoinAmount, Denomination, KeyStore, OutPoint, ScriptPubKey,
    SourceTx, TxId, TxIn, TxOut,
};

use crate::StakeError;

/// Security level zero-knowledge stake spends are built at.
pub const STAKE_SECURITY_LEVEL: u32 = 5;

/// External constructor for zero-knowledge spend inputs. Builds the
/// spend proof (over a witness from the accumulator registry) binding
/// the stake transaction's outputs.
pub trait ZkSpender {
    fn create_spend(
        &mut self,
        denomination: Denomination,
        serial: &BigUint,
        security_level: u32,
        hash_tx_out: &TxId,
    ) -> Result<TxIn, String>;
}

/// Stake collateral backed by a plain ledger output.
#[derive(Clone, Debug)]
pub struct LedgerStake {
    source: SourceTx,
    position: u32,
}

impl LedgerStake {
    pub fn new(source: SourceTx, position: u32) -> Result<LedgerStake, StakeError> {
        if position as usize >= source.outputs.len() {
            return Err(StakeError::BadOutpoint {
                txid: source.txid,
                vout: position,
            });
        }
        Ok(LedgerStake { source, position })
    }
}

/// Stake collateral backed by a zero-knowledge coin.
#[derive(Clone, Debug)]
pub struct ZkStake {
    denomination: Denomination,
    serial: BigUint,
    /// Accumulator checksum recovered from the spend proof; `None` for a
    /// direct mint-to-stake that has no spend yet.
    checksum: Option<u32>,
}

impl ZkStake {
    /// A coin staked through an existing spend proof.
    pub fn from_spend(denomination: Denomination, serial: BigUint, checksum: u32) -> ZkStake {
        ZkStake {
            denomination,
            serial,
            checksum: Some(checksum),
        }
    }

    /// A direct mint-to-stake: no accumulator-backed spend yet, so the
    /// reference block is a deliberately stale offset from the tip.
    pub fn from_mint(denomination: Denomination, serial: BigUint) -> ZkStake {
        ZkStake {
            denomination,
            serial,
            checksum: None,
        }
    }
}

/// Polymorphic stake input. One call-site contract, two variants.
#[derive(Clone, Debug)]
pub enum StakeInput {
    Ledger(LedgerStake),
    Zk(ZkStake),
}

impl StakeInput {
    /// Collateral value: the referenced output's amount, or the fixed
    /// amount implied by the coin's denomination.
    pub fn value(&self) -> CoinAmount {
        match self {
            StakeInput::Ledger(stake) => stake.source.outputs[stake.position as usize].value,
            StakeInput::Zk(stake) => stake.denomination.amount(),
        }
    }

    /// Stake-grinding guard: a byte string unique to this collateral.
    /// Ledger stakes use the outpoint; zero-knowledge stakes use the
    /// serial, which can stake at most once ever.
    pub fn uniqueness(&self) -> Result<Vec<u8>, StakeError> {
        match self {
            StakeInput::Ledger(stake) => {
                bincode::serialize(&(stake.position, stake.source.txid.as_bytes()))
                    .map_err(|e| StakeError::Encoding(e.to_string()))
            }
            StakeInput::Zk(stake) => bincode::serialize(&stake.serial.to_bytes_be())
                .map_err(|e| StakeError::Encoding(e.to_string())),
        }
    }

    /// Resolve the reference block the stake kernel is computed from.
    ///
    /// Ledger: the block confirming the source transaction, if on the
    /// active chain. Zero-knowledge: for a direct mint-to-stake, a
    /// stale checkpoint-aligned height below the tip (a matured
    /// checksum is required anyway, and the real tip must not leak);
    /// otherwise the first-seen height of the spend's accumulator
    /// checksum, rejected when it precedes activation or fell off the
    /// active chain.
    pub fn index_from(
        &self,
        chain: &dyn ChainCursor,
        registry: &AccumulatorRegistry,
    ) -> Option<BlockSummary> {
        match self {
            StakeInput::Ledger(stake) => chain.block_of_tx(&stake.source.txid),
            StakeInput::Zk(stake) => {
                let protocol = registry.protocol();
                match stake.checksum {
                    None => {
                        let tip = chain.tip_height()?;
                        let stale = tip.checked_sub(protocol.stake_min_depth)?;
                        chain.block_at(protocol.checkpoint_floor(stale))
                    }
                    Some(checksum) => {
                        let height = registry.height_of(checksum, stake.denomination).ok()?;
                        if height < protocol.activation_height {
                            return None;
                        }
                        chain.block_at(height)
                    }
                }
            }
        }
    }

    /// The stake-kernel modifier for this input.
    ///
    /// Ledger stakes read the chain's running modifier at the reference
    /// block. Zero-knowledge stakes instead scan forward until a block's
    /// time exceeds the reference time by the modifier window, then take
    /// the low bits of that block's checkpoint digest. This decouples
    /// the modifier source from the coin's true mint time.
    pub fn modifier(
        &self,
        chain: &dyn ChainCursor,
        registry: &AccumulatorRegistry,
    ) -> Result<u64, StakeError> {
        let from = self
            .index_from(chain, registry)
            .ok_or(StakeError::Unresolved)?;
        match self {
            StakeInput::Ledger(_) => chain
                .kernel_stake_modifier(&from.hash)
                .ok_or(StakeError::Unresolved),
            StakeInput::Zk(_) => {
                let window = registry.protocol().modifier_window_secs;
                let mut height = from.height;
                loop {
                    let block = chain
                        .block_at(height)
                        .ok_or(StakeError::ModifierUnavailable)?;
                    if block.time - from.time > window {
                        debug!(height, "stake modifier source block selected");
                        return Ok(block.checkpoint_digest.low64());
                    }
                    height += 1;
                }
            }
        }
    }

    /// Assemble the kernel input spending this collateral.
    pub fn create_tx_in(
        &self,
        spender: &mut dyn ZkSpender,
        hash_tx_out: &TxId,
    ) -> Result<TxIn, StakeError> {
        match self {
            StakeInput::Ledger(stake) => Ok(TxIn::Outpoint(OutPoint {
                txid: stake.source.txid,
                vout: stake.position,
            })),
            StakeInput::Zk(stake) => spender
                .create_spend(
                    stake.denomination,
                    &stake.serial,
                    STAKE_SECURITY_LEVEL,
                    hash_tx_out,
                )
                .map_err(StakeError::Spend),
        }
    }

    /// Assemble the kernel output.
    ///
    /// Ledger stakes re-use the kernel script, normalized to direct
    /// pay-to-key (pay-to-address is resolved through the key store;
    /// anything else is unsupported). Zero-knowledge stakes pay a fresh
    /// key and embed no coin data.
    pub fn create_tx_out(&self, keys: &mut dyn KeyStore) -> Result<TxOut, StakeError> {
        let script = match self {
            StakeInput::Ledger(stake) => {
                let kernel = &stake.source.outputs[stake.position as usize].script;
                match kernel {
                    ScriptPubKey::PayToPubkey(key) => ScriptPubKey::PayToPubkey(*key),
                    ScriptPubKey::PayToPubkeyHash(id) => {
                        let key = keys.key_for(id).ok_or(StakeError::MissingKey)?;
                        ScriptPubKey::PayToPubkey(key)
                    }
                    ScriptPubKey::Raw(_) => return Err(StakeError::UnsupportedScript),
                }
            }
            StakeInput::Zk(_) => ScriptPubKey::PayToPubkey(keys.fresh_key()),
        };
        Ok(TxOut { value: 0, script })
    }

    /// The single originating transaction, where one exists. A
    /// zero-knowledge coin's provenance is the accumulator, not an
    /// outpoint, so the zk variant always fails.
    pub fn tx_from(&self) -> Result<SourceTx, StakeError> {
        match self {
            StakeInput::Ledger(stake) => Ok(stake.source.clone()),
            StakeInput::Zk(_) => Err(StakeError::NoSourceTransaction),
        }
    }
}
