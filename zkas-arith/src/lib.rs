//! Group arithmetic primitives for the zkas anonymity-set machinery.
//!
//! This crate is the "primitive library" the rest of the workspace builds
//! on: arbitrary-precision modular arithmetic over `num-bigint`,
//! Miller–Rabin primality testing, the Pedersen coin-commitment group,
//! and the RSA-style accumulator with per-member witnesses. Group
//! parameters are plain serde data validated on load; a small built-in
//! development parameter set keeps tests fast.

pub mod accumulator;
pub mod params;
pub mod pedersen;
pub mod prime;

pub use accumulator::{Accumulator, AccumulatorWitness};
pub use params::{AccumulatorParams, CommitmentGroup, GroupParams, ParamsError};
pub use pedersen::commit;
pub use prime::is_prime;

use num_bigint::BigUint;

/// Interpret big-endian bytes as an integer and reduce it into the group
/// defined by `modulus`.
pub fn reduce_be_bytes(bytes: &[u8], modulus: &BigUint) -> BigUint {
    BigUint::from_bytes_be(bytes) % modulus
}
