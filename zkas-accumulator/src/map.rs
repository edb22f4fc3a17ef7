//! One accumulator per denomination, advanced together at checkpoints.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use zkas_arith::{Accumulator, GroupParams};
use zkas_common::{ChecksumDigest, Denomination};

use crate::checksum::checksum;

/// The full per-denomination accumulator state at one checkpoint.
#[derive(Clone, Debug)]
pub struct AccumulatorMap {
    accumulators: BTreeMap<Denomination, Accumulator>,
}

impl AccumulatorMap {
    /// Every denomination at its empty-set value.
    pub fn initial(params: &GroupParams) -> AccumulatorMap {
        let accumulators = Denomination::ALL
            .into_iter()
            .map(|denom| (denom, Accumulator::initial(&params.accumulator)))
            .collect();
        AccumulatorMap { accumulators }
    }

    /// Fold a confirmed mint into its denomination's accumulator.
    pub fn accumulate(&mut self, denom: Denomination, value: &BigUint) {
        self.accumulators
            .get_mut(&denom)
            .expect("map holds every denomination")
            .accumulate(value);
    }

    pub fn accumulator(&self, denom: Denomination) -> &Accumulator {
        &self.accumulators[&denom]
    }

    /// Replace one denomination's accumulator wholesale (checkpoint
    /// resume).
    pub fn set(&mut self, denom: Denomination, accumulator: Accumulator) {
        self.accumulators.insert(denom, accumulator);
    }

    /// The composite checksum digest of the current state.
    pub fn digest(&self) -> ChecksumDigest {
        let mut checksums = [0u32; 8];
        for denom in Denomination::ALL {
            checksums[denom.slot()] = checksum(self.accumulator(denom).value());
        }
        ChecksumDigest::compose(&checksums)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Denomination, &Accumulator)> {
        self.accumulators.iter().map(|(d, a)| (*d, a))
    }
}
