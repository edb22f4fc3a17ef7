//! Stake-input abstraction.
//!
//! Proof-of-stake collateral comes in two shapes: a plain ledger output
//! or a zero-knowledge coin. Both expose the same capability surface
//! (value, uniqueness, reference block, kernel modifier, input/output
//! assembly) behind one tagged enum, so the staking loop has a single
//! call-site contract and dispatch is a `match`, not a vtable.

pub mod input;

pub use input::{
    LedgerStake, StakeInput, ZkSpender, ZkStake, STAKE_SECURITY_LEVEL,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StakeError {
    /// Kernel script is neither pay-to-key nor pay-to-address.
    #[error("kernel script type is not supported for staking")]
    UnsupportedScript,
    /// Pay-to-address kernel whose key the wallet does not hold.
    #[error("wallet holds no key for the kernel script")]
    MissingKey,
    /// Zero-knowledge stakes have no single originating transaction.
    #[error("no source transaction exists for a zero-knowledge stake")]
    NoSourceTransaction,
    /// The stake's reference block could not be resolved on the active
    /// chain.
    #[error("stake reference block is not on the active chain")]
    Unresolved,
    /// The chain does not yet extend past the modifier window.
    #[error("chain does not extend far enough past the stake reference block")]
    ModifierUnavailable,
    /// The referenced output position does not exist.
    #[error("output {vout} does not exist in transaction {txid}")]
    BadOutpoint {
        txid: zkas_common::TxId,
        vout: u32,
    },
    /// Zero-knowledge spend construction failed.
    #[error("zero-knowledge spend construction failed: {0}")]
    Spend(String),
    #[error("stake encoding failed: {0}")]
    Encoding(String),
}
