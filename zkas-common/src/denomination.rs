//! The fixed set of coin denominations.

use serde::{Deserialize, Serialize};

use crate::{CoinAmount, COIN};

/// One of the fixed coin face values. The set is closed: every minted
/// coin carries exactly one of these, and the composite checksum digest
/// reserves one 32-bit slot per variant in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Denomination {
    One,
    Five,
    Ten,
    Fifty,
    OneHundred,
    FiveHundred,
    OneThousand,
    FiveThousand,
}

impl Denomination {
    /// Every denomination, in checksum-slot order.
    pub const ALL: [Denomination; 8] = [
        Denomination::One,
        Denomination::Five,
        Denomination::Ten,
        Denomination::Fifty,
        Denomination::OneHundred,
        Denomination::FiveHundred,
        Denomination::OneThousand,
        Denomination::FiveThousand,
    ];

    /// Face value in whole coins.
    pub fn face_value(self) -> u64 {
        match self {
            Denomination::One => 1,
            Denomination::Five => 5,
            Denomination::Ten => 10,
            Denomination::Fifty => 50,
            Denomination::OneHundred => 100,
            Denomination::FiveHundred => 500,
            Denomination::OneThousand => 1000,
            Denomination::FiveThousand => 5000,
        }
    }

    /// Face value in base units.
    pub fn amount(self) -> CoinAmount {
        self.face_value() * COIN
    }

    /// Position of this denomination's slot in the checksum digest.
    pub fn slot(self) -> usize {
        Denomination::ALL
            .iter()
            .position(|d| *d == self)
            .expect("every denomination has a slot")
    }

    /// Look a denomination up by face value.
    pub fn from_face_value(value: u64) -> Option<Denomination> {
        Denomination::ALL.into_iter().find(|d| d.face_value() == value)
    }
}
