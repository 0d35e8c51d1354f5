//! # Crosschain Testkit
//!
//! Testing utilities for crosschain.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Pinned encodings of notarisation payloads and burn descriptors
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Source, hub and target chains wired to real nodes
//!
//! ## Golden Vectors
//!
//! ```rust
//! use crosschain_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, hex) in verify_all_vectors() {
//!     println!("{name}: {matches} {hex}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use crosschain_testkit::generators::{burn_from_params, BurnParams};
//!
//! proptest! {
//!     #[test]
//!     fn burn_txid_is_deterministic(params: BurnParams) {
//!         prop_assert_eq!(burn_from_params(&params).txid(), burn_from_params(&params).txid());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use crosschain_testkit::fixtures::Network;
//! use crosschain_core::PublicKey;
//!
//! let mut network = Network::new().unwrap();
//! let (transfer, import) = network.transfer(1_000_000, &PublicKey([7; 32])).unwrap();
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{
    notarise, notarise_with, notary_directory, notary_keys, Network, TestChain, Transfer,
};
pub use generators::{burn_from_params, BurnParams};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
