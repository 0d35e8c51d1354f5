//! Authority families.
//!
//! Which notary set may notarise a chain is decided purely from its symbol.

use serde::{Deserialize, Serialize};

/// Symbol prefix of chains notarised by the TXSCL authority.
pub const TXSCL_PREFIX: &str = "TXSCL";

/// Symbol of chains whose notarisations are refused outright.
pub const BANNED_SYMBOL: &str = "THIS_CHAIN_IS_BANNED";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorityFamily {
    /// The hub chain's seasonal notaries.
    Komodo,
    /// A single fixed notary set.
    Txscl,
    /// Era-based notary sets selected by block timestamp.
    Staked,
}

/// Sub-classes of the staked family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StakedClass {
    Labs,
    Cfek,
    Test,
    Banned,
}

impl StakedClass {
    /// Numeric class as used on the wire by notary tooling.
    pub fn code(self) -> u8 {
        match self {
            StakedClass::Labs => 1,
            StakedClass::Cfek => 2,
            StakedClass::Test => 3,
            StakedClass::Banned => 255,
        }
    }
}

/// Staked class of `symbol`, if it belongs to the staked family.
pub fn staked_class(symbol: &str) -> Option<StakedClass> {
    if symbol == BANNED_SYMBOL {
        Some(StakedClass::Banned)
    } else if symbol.starts_with("LABS") {
        Some(StakedClass::Labs)
    } else if symbol.starts_with("CFEK") {
        Some(StakedClass::Cfek)
    } else if symbol.starts_with("TEST") {
        Some(StakedClass::Test)
    } else {
        None
    }
}

/// The authority family that notarises `symbol`.
pub fn authority_for_symbol(symbol: &str) -> AuthorityFamily {
    if symbol.starts_with(TXSCL_PREFIX) {
        AuthorityFamily::Txscl
    } else if staked_class(symbol).is_some() {
        AuthorityFamily::Staked
    } else {
        AuthorityFamily::Komodo
    }
}
