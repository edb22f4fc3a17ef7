//! The composite accumulator checksum digest carried in block headers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::denomination::Denomination;

/// 256-bit digest holding one 32-bit accumulator checksum per
/// denomination. Denomination `One` occupies the most significant four
/// bytes; the remaining denominations follow in slot order.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChecksumDigest(pub [u8; 32]);

impl ChecksumDigest {
    pub const ZERO: ChecksumDigest = ChecksumDigest([0u8; 32]);

    /// Assemble the digest from per-denomination checksums in slot order.
    pub fn compose(checksums: &[u32; 8]) -> ChecksumDigest {
        let mut bytes = [0u8; 32];
        for (slot, checksum) in checksums.iter().enumerate() {
            bytes[slot * 4..slot * 4 + 4].copy_from_slice(&checksum.to_be_bytes());
        }
        ChecksumDigest(bytes)
    }

    /// Extract the checksum recorded for `denom`.
    pub fn checksum_for(&self, denom: Denomination) -> u32 {
        let slot = denom.slot();
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.0[slot * 4..slot * 4 + 4]);
        u32::from_be_bytes(word)
    }

    /// Low 64 bits of the digest, used as a stake-modifier source.
    pub fn low64(&self) -> u64 {
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.0[24..32]);
        u64::from_be_bytes(word)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ChecksumDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChecksumDigest({})", self.to_hex())
    }
}

impl fmt::Display for ChecksumDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
