//! Group parameter sets: the Pedersen coin-commitment group and the
//! accumulator group, with validation.
//!
//! Parameter sets are plain serde data. Production sets are distributed
//! out of band and loaded with [`GroupParams::from_json`]; the built-in
//! [`GroupParams::dev`] set uses a 62-bit safe-prime commitment group and
//! a 64-bit accumulator modulus so the commitment search and primality
//! tests complete in microseconds during tests.

use num_bigint::BigUint;
use num_traits::One;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prime::is_prime;

/// Parameter validation and configuration failures. All of these are
/// fatal: the caller must not proceed with a parameter set that failed
/// validation, and a commitment search that exhausts its attempt ceiling
/// indicates the parameter set itself is unusable.
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("commitment group modulus is not prime")]
    CompositeModulus,
    #[error("commitment group order is not prime")]
    CompositeGroupOrder,
    #[error("generator {0} is not an element of order `group_order`")]
    BadGenerator(&'static str),
    #[error("coin value range is empty or exceeds the commitment modulus")]
    BadCoinValueRange,
    #[error("accumulator base is outside the accumulator group")]
    BadAccumulatorBase,
    #[error("commitment search exceeded {0} attempts; group parameters are unusable")]
    AttemptCeiling(u32),
    #[error("parameter set is malformed: {0}")]
    Malformed(String),
}

/// The Schnorr group the Pedersen coin commitments live in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitmentGroup {
    /// Prime modulus `p`.
    #[serde(with = "serde_biguint")]
    pub modulus: BigUint,
    /// Prime order `q` of the subgroup generated by `g` and `h`.
    #[serde(with = "serde_biguint")]
    pub group_order: BigUint,
    /// First generator.
    #[serde(with = "serde_biguint")]
    pub g: BigUint,
    /// Second generator, independent of `g`.
    #[serde(with = "serde_biguint")]
    pub h: BigUint,
}

/// The accumulator group and the range of acceptable coin values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccumulatorParams {
    /// RSA-style accumulator modulus `N`.
    #[serde(with = "serde_biguint")]
    pub modulus: BigUint,
    /// Accumulator value of the empty set.
    #[serde(with = "serde_biguint")]
    pub base: BigUint,
    /// Smallest acceptable coin public value.
    #[serde(with = "serde_biguint")]
    pub min_coin_value: BigUint,
    /// Largest acceptable coin public value.
    #[serde(with = "serde_biguint")]
    pub max_coin_value: BigUint,
}

/// A complete, validated parameter set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupParams {
    pub commitment: CommitmentGroup,
    pub accumulator: AccumulatorParams,
    /// Miller–Rabin witness rounds used when testing commitment values.
    pub primality_rounds: usize,
    /// Ceiling on randomness retries in the commitment search. Exceeding
    /// it surfaces as [`ParamsError::AttemptCeiling`].
    pub max_commitment_attempts: u32,
}

static DEV_PARAMS: Lazy<GroupParams> = Lazy::new(|| {
    let params = GroupParams {
        commitment: CommitmentGroup {
            // p = 2q + 1, both prime; g and h are quadratic residues and
            // therefore generate the order-q subgroup.
            modulus: BigUint::from(4_611_686_018_427_377_339u64),
            group_order: BigUint::from(2_305_843_009_213_688_669u64),
            g: BigUint::from(4u32),
            h: BigUint::from(9u32),
        },
        accumulator: AccumulatorParams {
            // 4294967291 * 4294967279
            modulus: BigUint::from(18_446_743_979_220_271_189u64),
            base: BigUint::from(961u32),
            min_coin_value: BigUint::from(65_536u32),
            max_coin_value: BigUint::from(4_611_686_018_427_377_338u64),
        },
        primality_rounds: 12,
        max_commitment_attempts: 30_000,
    };
    params.validate().expect("built-in dev parameters are valid");
    params
});

impl GroupParams {
    /// The built-in development parameter set.
    pub fn dev() -> &'static GroupParams {
        &DEV_PARAMS
    }

    /// Parse and validate a parameter set from JSON.
    pub fn from_json(json: &str) -> Result<GroupParams, ParamsError> {
        let params: GroupParams =
            serde_json::from_str(json).map_err(|e| ParamsError::Malformed(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Check the structural invariants of the parameter set.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let c = &self.commitment;
        if !is_prime(&c.modulus, self.primality_rounds) {
            return Err(ParamsError::CompositeModulus);
        }
        if !is_prime(&c.group_order, self.primality_rounds) {
            return Err(ParamsError::CompositeGroupOrder);
        }
        check_generator(&c.g, c, "g")?;
        check_generator(&c.h, c, "h")?;
        if c.g == c.h {
            return Err(ParamsError::BadGenerator("h"));
        }

        let a = &self.accumulator;
        if a.min_coin_value >= a.max_coin_value || a.max_coin_value >= c.modulus {
            return Err(ParamsError::BadCoinValueRange);
        }
        if a.base <= BigUint::one() || a.base >= a.modulus {
            return Err(ParamsError::BadAccumulatorBase);
        }
        if self.max_commitment_attempts == 0 {
            return Err(ParamsError::Malformed(
                "max_commitment_attempts must be nonzero".into(),
            ));
        }
        Ok(())
    }
}

fn check_generator(
    candidate: &BigUint,
    group: &CommitmentGroup,
    name: &'static str,
) -> Result<(), ParamsError> {
    if candidate <= &BigUint::one() || candidate >= &group.modulus {
        return Err(ParamsError::BadGenerator(name));
    }
    // order divides q; q prime and candidate != 1 pins the order to q
    if !candidate
        .modpow(&group.group_order, &group.modulus)
        .is_one()
    {
        return Err(ParamsError::BadGenerator(name));
    }
    Ok(())
}

/// Serde adapter storing `BigUint` as a `0x`-prefixed big-endian hex
/// string, matching how the rest of the workspace renders large values.
pub mod serde_biguint {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(value.to_bytes_be())))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        let digits = text.strip_prefix("0x").unwrap_or(&text);
        // hex::decode requires an even number of digits
        let padded = if digits.len() % 2 == 1 {
            format!("0{digits}")
        } else {
            digits.to_string()
        };
        let bytes = hex::decode(&padded).map_err(de::Error::custom)?;
        Ok(BigUint::from_bytes_be(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_params_validate() {
        assert!(GroupParams::dev().validate().is_ok());
    }

    #[test]
    fn json_round_trip() {
        let json = serde_json::to_string(GroupParams::dev()).unwrap();
        let parsed = GroupParams::from_json(&json).unwrap();
        assert_eq!(parsed.commitment.modulus, GroupParams::dev().commitment.modulus);
        assert_eq!(parsed.accumulator.base, GroupParams::dev().accumulator.base);
    }

    #[test]
    fn composite_modulus_is_rejected() {
        let mut params = GroupParams::dev().clone();
        params.commitment.modulus = BigUint::from(4_611_686_018_427_377_341u64);
        assert!(matches!(
            params.validate(),
            Err(ParamsError::CompositeModulus) | Err(ParamsError::BadGenerator(_))
        ));
    }

    #[test]
    fn generator_outside_subgroup_is_rejected() {
        let mut params = GroupParams::dev().clone();
        // 2 is a quadratic non-residue mod a safe prime p = 3 mod 8, so
        // its order is 2q rather than q.
        params.commitment.g = BigUint::from(2u32);
        assert!(matches!(params.validate(), Err(ParamsError::BadGenerator("g"))));
    }

    #[test]
    fn empty_coin_range_is_rejected() {
        let mut params = GroupParams::dev().clone();
        params.accumulator.min_coin_value = params.accumulator.max_coin_value.clone();
        assert!(matches!(params.validate(), Err(ParamsError::BadCoinValueRange)));
    }
}
