//! # Crosschain Authority
//!
//! Who may notarise which chain, and whether a transaction carries their
//! signatures.
//!
//! ## Key Types
//!
//! - [`AuthorityFamily`] - Notary family chosen from a chain symbol
//! - [`CrosschainAuthority`] - A notary set and its threshold
//! - [`NotaryDirectory`] - Seasons, staked eras and the TXSCL set, injected
//!   as configuration
//!
//! ## Checks
//!
//! - [`check_tx_authority`] - Every input spends a distinct notary's
//!   pay-to-pubkey output and the threshold is met
//! - [`scan_block_notarisations`] - The authorised notarisations of a block

pub mod check;
pub mod detect;
pub mod directory;
pub mod error;
pub mod family;

pub use check::check_tx_authority;
pub use detect::{authority_for_notarisation, scan_block_notarisations};
pub use directory::{
    CrosschainAuthority, EraWindow, NotaryDirectory, NotaryLookup, NotarySeason, MAX_NOTARIES,
    STAKED_ERA_GAP,
};
pub use error::{AuthorityError, Result};
pub use family::{authority_for_symbol, staked_class, AuthorityFamily, StakedClass};
