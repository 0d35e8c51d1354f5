//! # Crosschain Store
//!
//! Storage for the notarisation index. The index is written at block
//! connect/disconnect and read by proof construction and validation.
//!
//! ## Key Types
//!
//! - [`KvStore`] - Byte-keyed engine with prefix scans and atomic batches
//! - [`SqliteStore`] - SQLite-based persistent engine
//! - [`MemoryStore`] - In-memory engine for tests
//! - [`NotarisationDb`] - Block notarisations, back-notarisation index,
//!   import tombstones and the forward/backward scans over them
//!
//! ## Usage
//!
//! ```rust,no_run
//! use crosschain_store::{NotarisationDb, SqliteStore};
//!
//! let db = NotarisationDb::new(SqliteStore::open("notarisations.db").unwrap());
//! // db.connect_block(&block_hash, &notarisations, &imported_burns)?;
//! ```
//!
//! ## Design Notes
//!
//! - **Absence is not failure**: corrupt entries and engine read errors are
//!   logged and surface as "not found"
//! - **Block-boundary atomicity**: each connect or disconnect is one batch
//!   under a single writer lock

pub mod error;
pub mod memory;
pub mod migration;
pub mod notarisation;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use notarisation::NotarisationDb;
pub use sqlite::SqliteStore;
pub use traits::{BatchOp, KvStore, WriteBatch};
