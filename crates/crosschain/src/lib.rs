//! # Crosschain
//!
//! Cross-chain notarisation and coin import: value burned on one chain is
//! re-issued on another, proven only from data every full node already
//! has.
//!
//! ## Overview
//!
//! - **Notarisations** commit a chain's recent blocks (its MoM) to the hub
//!   chain; back-notarisations bring a MoMoM over many chains' MoMs back
//! - **Proofs** compose Merkle branches from a burn transaction up to a
//!   MoMoM the destination chain has seen
//! - **Imports** are rebuilt canonically from (proof, burn, payouts) and
//!   checked by [`ImportValidator`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use crosschain::{ChainParams, CrosschainNode};
//! use crosschain::authority::NotaryDirectory;
//! use crosschain::core::MemoryChain;
//! use crosschain::store::SqliteStore;
//!
//! async fn example(import_tx: crosschain::core::Transaction) {
//!     let store = SqliteStore::open("notarisations.db").unwrap();
//!     let node = CrosschainNode::new(
//!         ChainParams::new("ASSETB", 200),
//!         NotaryDirectory::default(),
//!         store,
//!         Arc::new(MemoryChain::new()),
//!     )
//!     .unwrap();
//!
//!     match node.validate_import(&import_tx).await {
//!         Ok(()) => println!("valid"),
//!         Err(e) => println!("{e}"),
//!     }
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `crosschain::core` - Primitives, codecs and wire formats
//! - `crosschain::store` - Storage engines and the notarisation index
//! - `crosschain::authority` - Notary sets and threshold checks
//! - `crosschain::proof` - Proof construction

pub mod approval;
pub mod config;
pub mod error;
pub mod migration;
pub mod node;
pub mod targets;
pub mod validator;

// Re-export component crates
pub use crosschain_authority as authority;
pub use crosschain_core as core;
pub use crosschain_proof as proof;
pub use crosschain_store as store;

pub use approval::check_notaries_approval;
pub use config::{
    ChainParams, DEFAULT_NETWORK_FEE, MIN_FUNGIBLE_CC_ID, NOTARY_APPROVAL_QUORUM, WILDCARD_CC_ID,
};
pub use error::{CrosschainError, ImportError, Rejection, Result};
pub use migration::check_token_migration;
pub use node::CrosschainNode;
pub use targets::{GatewayBinding, GatewayDepositProof, LightClient, OracleSource, TargetKind};
pub use validator::ImportValidator;

// Checks shared with other notarisation-dependent code
pub use crosschain_authority::{authority_for_symbol, check_tx_authority};
pub use crosschain_proof::check_mo_mom;
