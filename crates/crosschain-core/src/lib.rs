//! # Crosschain Core
//!
//! Pure primitives for cross-chain notarisation and coin import.
//!
//! This crate contains no I/O, no storage, no networking. It defines the
//! consensus encodings shared by proof producers and validators.
//!
//! ## Key Types
//!
//! - [`Hash256`] - Double-SHA256 digest (txids, block hashes, MoM, MoMoM)
//! - [`MerkleBranch`] - Position plus sibling path, composable across trees
//! - [`NotarisationData`] - Checkpoint payload of a notarisation transaction
//! - [`ImportProof`] - Proof attached to an import transaction
//! - [`ChainView`] - Read access to the active chain
//!
//! ## Encoding
//!
//! Everything hashed or committed goes through [`codec`]: little-endian
//! integers, Bitcoin CompactSize and `VARINT`, NUL-terminated symbols.

pub mod chain;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod import;
pub mod merkle;
pub mod notarisation;
pub mod proof;
pub mod script;
pub mod transaction;
pub mod types;

pub use chain::memory::MemoryChain;
pub use chain::ChainView;
pub use codec::{deserialize, serialize, serialize_hash, Decodable, Decoder, Encodable, Encoder};
pub use crypto::{hash256, hash_pair, Keypair, PublicKey, Signature};
pub use error::{CoreError, Result};
pub use import::{
    burn_amount, is_import_coin, make_burn_output, make_import_coin_transaction, payouts_hash,
    unmarshal_burn_tx, unmarshal_import_tx, BurnDescriptor, ImportPayload, TokenCreation,
    TokenMigration, EVAL_IMPORTCOIN, EVAL_TOKENS, IMPORT_PREVOUT_INDEX,
};
pub use merkle::{compute_root, merkle_root, MerkleBranch, MerkleTree};
pub use notarisation::{
    parse_notarisation_op_return, BackNotarisation, Notarisation, NotarisationContext,
    NotarisationData, NotarisationsInBlock,
};
pub use proof::{ImportProof, InclusionProof, TxProof};
pub use script::{Condition, Script};
pub use transaction::{block_merkle_root, Block, BlockInfo, OutPoint, Transaction, TxIn, TxOut};
pub use types::{BlockHash, Hash256, TxId};
