//! RSA-style accumulator with per-member witnesses.
//!
//! The accumulator of a set `{c_1, .., c_n}` of prime coin values is
//! `base^(c_1 * .. * c_n) mod N`, folded incrementally one member at a
//! time. A member's witness is the accumulator of every *other* member;
//! raising the witness to the member's value must reproduce the full
//! accumulator.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::params::{serde_biguint, AccumulatorParams};

/// Incrementally folded accumulator state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accumulator {
    #[serde(with = "serde_biguint")]
    modulus: BigUint,
    #[serde(with = "serde_biguint")]
    value: BigUint,
}

impl Accumulator {
    /// The accumulator of the empty set.
    pub fn initial(params: &AccumulatorParams) -> Accumulator {
        Accumulator {
            modulus: params.modulus.clone(),
            value: params.base.clone(),
        }
    }

    /// Resume from a previously recorded accumulator value.
    pub fn from_value(params: &AccumulatorParams, value: BigUint) -> Accumulator {
        Accumulator {
            modulus: params.modulus.clone(),
            value,
        }
    }

    /// Fold a member into the set.
    pub fn accumulate(&mut self, member: &BigUint) {
        self.value = self.value.modpow(member, &self.modulus);
    }

    pub fn value(&self) -> &BigUint {
        &self.value
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }
}

/// Membership witness for a single coin value.
///
/// The witness owns its own accumulator, seeded from a snapshot that
/// predates the member's inclusion, and folds every other member added
/// since. [`AccumulatorWitness::fold`] silently skips the member itself
/// so callers can replay whole blocks without special-casing the coin.
#[derive(Clone, Debug)]
pub struct AccumulatorWitness {
    inner: Accumulator,
    member: BigUint,
}

impl AccumulatorWitness {
    /// Start a witness from an accumulator snapshot that does not yet
    /// contain `member`.
    pub fn new(snapshot: Accumulator, member: BigUint) -> AccumulatorWitness {
        AccumulatorWitness {
            inner: snapshot,
            member,
        }
    }

    /// Fold another set member into the witness. Folding the witnessed
    /// member itself is a no-op and reports `false`.
    pub fn fold(&mut self, other: &BigUint) -> bool {
        if *other == self.member {
            return false;
        }
        self.inner.accumulate(other);
        true
    }

    pub fn member(&self) -> &BigUint {
        &self.member
    }

    pub fn value(&self) -> &BigUint {
        self.inner.value()
    }

    /// Check that this witness, combined with its member, reproduces the
    /// full accumulator.
    pub fn verify(&self, accumulator: &Accumulator) -> bool {
        self.inner.value().modpow(&self.member, self.inner.modulus()) == *accumulator.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::GroupParams;

    fn members() -> [BigUint; 3] {
        [
            BigUint::from(131_071u32),
            BigUint::from(524_287u32),
            BigUint::from(6_700_417u32),
        ]
    }

    #[test]
    fn witness_reproduces_accumulator() {
        let params = &GroupParams::dev().accumulator;
        let [a, b, c] = members();

        let mut acc = Accumulator::initial(params);
        for m in [&a, &b, &c] {
            acc.accumulate(m);
        }

        let mut witness = AccumulatorWitness::new(Accumulator::initial(params), b.clone());
        assert!(witness.fold(&a));
        assert!(!witness.fold(&b));
        assert!(witness.fold(&c));
        assert!(witness.verify(&acc));
    }

    #[test]
    fn witness_fails_for_non_member() {
        let params = &GroupParams::dev().accumulator;
        let [a, b, c] = members();

        let mut acc = Accumulator::initial(params);
        acc.accumulate(&a);
        acc.accumulate(&b);

        let mut witness = AccumulatorWitness::new(Accumulator::initial(params), c.clone());
        witness.fold(&a);
        witness.fold(&b);
        assert!(!witness.verify(&acc));
    }

    #[test]
    fn fold_order_does_not_matter() {
        let params = &GroupParams::dev().accumulator;
        let [a, b, c] = members();

        let mut forward = Accumulator::initial(params);
        let mut reverse = Accumulator::initial(params);
        for m in [&a, &b, &c] {
            forward.accumulate(m);
        }
        for m in [&c, &b, &a] {
            reverse.accumulate(m);
        }
        assert_eq!(forward.value(), reverse.value());
    }

    #[test]
    fn witness_resumes_from_snapshot() {
        let params = &GroupParams::dev().accumulator;
        let [a, b, c] = members();

        // Snapshot contains only `a`; the witnessed member `b` and the
        // later member `c` arrive afterwards.
        let mut snapshot = Accumulator::initial(params);
        snapshot.accumulate(&a);

        let mut acc = snapshot.clone();
        acc.accumulate(&b);
        acc.accumulate(&c);

        let mut witness = AccumulatorWitness::new(snapshot, b.clone());
        witness.fold(&c);
        assert!(witness.verify(&acc));
    }
}
