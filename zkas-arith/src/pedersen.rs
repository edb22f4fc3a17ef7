//! Pedersen commitments over the coin-commitment group.

use num_bigint::BigUint;

use crate::params::CommitmentGroup;

/// `g^serial * h^randomness mod p`. Binding and hiding under the
/// discrete-log assumption in the subgroup of order `group_order`.
pub fn commit(group: &CommitmentGroup, serial: &BigUint, randomness: &BigUint) -> BigUint {
    let gs = group.g.modpow(serial, &group.modulus);
    let hr = group.h.modpow(randomness, &group.modulus);
    (gs * hr) % &group.modulus
}
