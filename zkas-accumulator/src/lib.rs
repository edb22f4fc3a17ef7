//! Accumulator checkpoint registry and witness generation.
//!
//! At every checkpoint height the per-denomination accumulators over the
//! confirmed mint set are frozen, fingerprinted with a 32-bit checksum,
//! and published as a composite digest in the block header. This crate
//! owns that registry (computing checkpoints, persisting the
//! checksum → (value, height) mapping, validating candidate digests,
//! rolling checkpoints back on reorg) and the membership-witness
//! generator that replays the mint stream to prove a coin is in the set
//! without pointing at it.

pub mod checksum;
pub mod map;
pub mod registry;
pub mod witness;

pub use checksum::checksum;
pub use map::AccumulatorMap;
pub use registry::{
    AccumulatorRegistry, ChecksumStore, MemoryChecksumStore, RegistryError, SqliteChecksumStore,
};
pub use witness::{
    build_witnesses, randomize_security_level, CoinWitnessData, WitnessError, MAX_SECURITY_LEVEL,
};
