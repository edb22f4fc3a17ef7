//! Deterministic mint engine and reservation pool.
//!
//! Every coin a wallet can ever spend is derived from one 256-bit master
//! seed and a monotonic sequence counter. The counter is persisted
//! *before* any value derived from it escapes, so a crash can waste an
//! index but can never hand the same index out twice. The reservation
//! pool keeps a lookahead window of derived commitments and reconciles
//! them against the confirmed-mint index to recover wallet state from
//! the seed alone.

pub mod derive;
pub mod pool;
pub mod store;
pub mod wallet;

pub use derive::{derive_mint, derive_opening, MintCommitment};
pub use store::{SqliteWalletStore, WalletStore};
pub use wallet::MintWallet;

use thiserror::Error;
use zkas_arith::ParamsError;

#[derive(Debug, Error)]
pub enum WalletError {
    /// Durable write or read failed. Fatal for the in-flight operation;
    /// the whole operation may be retried once storage recovers.
    #[error("wallet store failure: {0}")]
    Storage(String),
    /// Group parameters are malformed or unusable. Never retried.
    #[error(transparent)]
    Params(#[from] ParamsError),
}
