//! Miller–Rabin primality testing over `num-bigint`.

use num_bigint::BigUint;
use num_traits::{One, Zero};

/// Witness bases, in order. The first twelve make the test deterministic
/// for candidates below 3.3 * 10^24, which covers every development
/// parameter set; larger production moduli get a probabilistic test with
/// as many bases as the parameter set requests.
const WITNESS_BASES: [u32; 40] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173,
];

/// Miller–Rabin primality test with `rounds` witness bases.
///
/// Candidates divisible by one of the witness bases are rejected by trial
/// division before any modular exponentiation runs, which disposes of the
/// bulk of the composites produced by the commitment search cheaply.
pub fn is_prime(candidate: &BigUint, rounds: usize) -> bool {
    let two = BigUint::from(2u32);
    if candidate < &two {
        return false;
    }

    for &base in WITNESS_BASES.iter() {
        let base = BigUint::from(base);
        if *candidate == base {
            return true;
        }
        if (candidate % &base).is_zero() {
            return false;
        }
    }

    // candidate - 1 = d * 2^s with d odd
    let one = BigUint::one();
    let n_minus_one = candidate - &one;
    let s = n_minus_one
        .trailing_zeros()
        .expect("candidate - 1 is nonzero");
    let d = &n_minus_one >> s;

    let rounds = rounds.clamp(1, WITNESS_BASES.len());
    'witness: for &base in WITNESS_BASES.iter().take(rounds) {
        let mut x = BigUint::from(base).modpow(&d, candidate);
        if x.is_one() || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = (&x * &x) % candidate;
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}
