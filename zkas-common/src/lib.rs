//! Shared domain types for the zkas anonymity-set machinery.
//!
//! This crate holds the vocabulary every other member speaks:
//! denominations, block/transaction identifiers, the composite checksum
//! digest carried in block headers, protocol parameters, stake script
//! types, and the traits behind which the external collaborators (chain
//! cursor, confirmed-mint index, key store) live.

pub mod chain;
pub mod checksum;
pub mod denomination;
pub mod ids;
pub mod mint;
pub mod protocol;
pub mod script;

pub use chain::{BlockSummary, ChainCursor, ChainMint, IndexError, MintIndex, MintLocation};
pub use checksum::ChecksumDigest;
pub use denomination::Denomination;
pub use ids::{BlockHash, TxId};
pub use mint::MintRecord;
pub use protocol::ProtocolParams;
pub use script::{KeyId, KeyStore, OutPoint, PubKey, ScriptPubKey, SourceTx, TxIn, TxOut, ZkSpend};

/// Monetary amount in base units.
pub type CoinAmount = u64;

/// Base units per whole coin.
pub const COIN: CoinAmount = 100_000_000;
