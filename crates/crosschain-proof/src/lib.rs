//! # Crosschain Proof
//!
//! Construction of the proofs carried by import transactions.
//!
//! A burn transaction is proven in three steps, each a Merkle branch:
//! transaction to block Merkle root, block Merkle root to the source
//! chain's MoM, and MoM to the target chain's MoMoM on the hub. The
//! branches compose into one [`TxProof`](crosschain_core::TxProof).
//!
//! ## Operations
//!
//! - [`get_assetchain_proof`] - On the source chain, up to the MoM
//! - [`get_cross_chain_proof`] - On the hub, from the MoM to a MoMoM
//! - [`complete_import_transaction`] - Rebuild an import around the
//!   extended proof
//! - [`calculate_proof_root`] - The MoMoM window for a target chain
//! - [`check_mo_mom`] - Whether a back-notarisation commits a MoMoM
//!
//! ## Consensus constants
//!
//! The scan limits below decide which notarisations a proof may use.
//! Producers and validators must agree on them; changing any of them
//! changes consensus.

pub mod assetchain;
pub mod error;
pub mod hub;
pub mod root;

#[cfg(test)]
mod test_support;

pub use assetchain::get_assetchain_proof;
pub use error::{ProofError, Result};
pub use hub::{check_mo_mom, complete_import_transaction, get_cross_chain_proof};
pub use root::{calculate_proof_root, compute_mom, mom_leaves, ProofRoot};

/// Hub blocks a notarisation scan visits.
pub const NOTARISATION_SCAN_LIMIT_BLOCKS: u32 = 1440;

/// Own-chain notarisations that close a MoMoM window.
pub const MAX_OWN_NOTARISATIONS_IN_WINDOW: usize = 7;

/// Blocks below a back-notarisation where the MoMoM rescan starts.
pub const BACK_NOTARISATION_RESCAN_DEPTH: u32 = 100;
