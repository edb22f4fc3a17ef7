//! 32-bit fingerprints of accumulator values.

use num_bigint::BigUint;

/// Truncated digest of an accumulator value: the first four bytes of its
/// blake3 hash, big-endian. Checksums are the compact on-chain handle
/// for full accumulator values; the registry treats two distinct values
/// hashing to the same checksum as fatal ambiguity.
pub fn checksum(value: &BigUint) -> u32 {
    let hash = blake3::hash(&value.to_bytes_be());
    let mut word = [0u8; 4];
    word.copy_from_slice(&hash.as_bytes()[..4]);
    u32::from_be_bytes(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_deterministic() {
        let value = BigUint::from(987_654_321u64);
        assert_eq!(checksum(&value), checksum(&value));
    }

    #[test]
    fn nearby_values_get_distinct_checksums() {
        let value = BigUint::from(987_654_321u64);
        assert_ne!(checksum(&value), checksum(&(value.clone() + 1u32)));
    }
}
