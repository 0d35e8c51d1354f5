//! Error types for proof construction.

use crosschain_core::{CoreError, TxId};
use thiserror::Error;

/// Reasons a proof could not be built.
///
/// Construction never returns a partial proof; every failure is one of
/// these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("cannot find transaction {0}")]
    TransactionNotFound(TxId),

    #[error("transaction {0} is still in the mempool")]
    InMempool(TxId),

    /// No own back-notarisation covers the transaction's block yet.
    #[error("back-notarisation not yet confirmed")]
    NotNotarisedYet,

    #[error("block at offset {offset} outside MoM window of depth {depth}")]
    BlockOutsideWindow { offset: u32, depth: u16 },

    #[error("error locating tx in block")]
    TxNotInBlock,

    #[error("failed merkle block->MoM")]
    BlockToMomMismatch,

    #[error("failed merkle tx->block")]
    TxToBlockMismatch,

    #[error("failed validating MoM")]
    MomMismatch,

    #[error("notarisation {0} not found")]
    NotarisationNotFound(TxId),

    #[error("cannot find notarisation for {0} inclusive of source")]
    NoTargetNotarisation(String),

    /// Fewer own-chain notarisations than needed in the scan window.
    #[error("no MoMs found")]
    Indeterminate,

    #[error("couldn't find MoM within MoMoM set")]
    MomNotInWindow,

    #[error("proof check failed")]
    ProofCheckFailed,

    #[error("no back-notarisation for {0}")]
    BackNotarisationNotFound(TxId),

    #[error("incorrect import tx proof")]
    NotMerkleBranch,

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for proof construction.
pub type Result<T> = std::result::Result<T, ProofError>;
