//! Application identifiers known to this crate.
//!
//! Both tables are ordered. Classification takes the first entry that is a prefix of the AID,
//! and brute-force discovery selects the entries in this order, so entries must not be sorted or
//! moved around.

use std::fmt::{Display, Formatter};

use hex_literal::hex;

/// Payment system a card application belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Vendor {
    Visa,
    MasterCard,
    AmericanExpress,
    Jcb,
    CartesBancaires,
    Other,
}

impl Display for Vendor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Visa => "Visa",
            Self::MasterCard => "MasterCard",
            Self::AmericanExpress => "American Express",
            Self::Jcb => "JCB",
            Self::CartesBancaires => "Cartes Bancaires",
            Self::Other => "Other",
        })
    }
}

/// An entry of [`KNOWN_AIDS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownAid {
    pub vendor: Vendor,
    pub aid: &'static [u8],
}

/// Directory applications listing the payment applications of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Directory {
    /// Payment System Environment, `1PAY.SYS.DDF01`, for contact cards.
    Pse,

    /// Proximity Payment System Environment, `2PAY.SYS.DDF01`, for contactless cards.
    Ppse,
}

impl Directory {
    /// Name of the directory application, to be selected as an AID.
    pub fn name(self) -> &'static [u8] {
        match self {
            Self::Ppse => PSE_LIST[0],
            Self::Pse => PSE_LIST[1],
        }
    }
}

impl TryFrom<u8> for Directory {
    type Error = u8;

    /// Maps `1` to the PSE and `2` to the PPSE.
    fn try_from(number: u8) -> Result<Self, Self::Error> {
        match number {
            1 => Ok(Self::Pse),
            2 => Ok(Self::Ppse),
            n => Err(n),
        }
    }
}

pub const PSE_LIST: [&[u8]; 2] = [b"2PAY.SYS.DDF01", b"1PAY.SYS.DDF01"];

macro_rules! known {
    ($vendor: ident, $aid: literal) => {
        KnownAid {
            vendor: Vendor::$vendor,
            aid: &hex!($aid),
        }
    };
}

pub const KNOWN_AIDS: &[KnownAid] = &[
    // Visa International
    known!(Visa, "A00000000305076010"), // ELO Credit
    known!(Visa, "A0000000031010"),     // Debit/Credit (Classic)
    known!(Visa, "A000000003101001"),   // Credit
    known!(Visa, "A000000003101002"),   // Debit
    known!(Visa, "A0000000032010"),     // Electron
    known!(Visa, "A0000000032020"),     // V PAY
    known!(Visa, "A0000000033010"),     // Interlink
    known!(Visa, "A0000000034010"),
    known!(Visa, "A0000000035010"),
    known!(Visa, "A0000000036010"),     // Domestic Visa Cash
    known!(Visa, "A0000000036020"),     // International Visa Cash
    known!(Visa, "A0000000038002"),     // Remote authentication (DPA)
    known!(Visa, "A0000000038010"),     // Plus
    known!(Visa, "A0000000039010"),     // Loyalty
    known!(Visa, "A000000003999910"),   // Proprietary ATM
    // Visa USA
    known!(Visa, "A000000098"),
    known!(Visa, "A0000000980848"),
    // Mastercard International
    known!(MasterCard, "A00000000401"),       // PayPass
    known!(MasterCard, "A0000000041010"),     // Credit
    known!(MasterCard, "A00000000410101213"), // Credit
    known!(MasterCard, "A00000000410101215"), // Credit
    known!(MasterCard, "A0000000042010"),
    known!(MasterCard, "A0000000043010"),
    known!(MasterCard, "A0000000043060"),     // Maestro
    known!(MasterCard, "A000000004306001"),   // Maestro
    known!(MasterCard, "A0000000044010"),
    known!(MasterCard, "A0000000045010"),
    known!(MasterCard, "A0000000046000"),     // Cirrus
    known!(MasterCard, "A0000000048002"),     // SecureCode EMV-CAP
    known!(MasterCard, "A0000000049999"),     // PayPass
    // American Express
    known!(AmericanExpress, "A000000025"),
    known!(AmericanExpress, "A0000000250000"),
    known!(AmericanExpress, "A00000002501"),
    known!(AmericanExpress, "A000000025010402"),
    known!(AmericanExpress, "A000000025010701"),
    known!(AmericanExpress, "A000000025010801"),
    // Groupement des Cartes Bancaires
    known!(CartesBancaires, "A0000000421010"),
    known!(CartesBancaires, "A0000000422010"),
    known!(CartesBancaires, "A0000000423010"),
    known!(CartesBancaires, "A0000000424010"),
    known!(CartesBancaires, "A0000000425010"),
    // JCB
    known!(Jcb, "A00000006510"),
    known!(Jcb, "A0000000651010"), // J Smart Credit
    // Others
    known!(Other, "A0000001544442"), // Banricompras Debito
    known!(Other, "F0000000030001"), // Bradesco
    known!(Other, "A0000005241010"), // RuPay
    known!(Other, "D5780000021010"), // BankAxept
];

/// Finds the first table entry that is a prefix of the AID.
pub fn lookup(aid: &[u8]) -> Option<&'static KnownAid> {
    KNOWN_AIDS.iter().find(|known| aid.starts_with(known.aid))
}

/// Classifies the AID by payment system.
pub fn vendor(aid: &[u8]) -> Option<Vendor> {
    lookup(aid).map(|known| known.vendor)
}
