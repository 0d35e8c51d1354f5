//! Error types for the cross-chain core primitives.

use thiserror::Error;

/// Errors raised while encoding, decoding or verifying core data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("unexpected end of data: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("{0} trailing bytes after decoding")]
    TrailingBytes(usize),

    #[error("non-canonical compact size")]
    NonCanonicalCompactSize,

    #[error("varint overflows 64 bits")]
    VarIntOverflow,

    #[error("length {0} exceeds remaining data")]
    LengthTooLarge(u64),

    #[error("couldn't parse symbol")]
    InvalidSymbol,

    #[error("merkle branch too long to index: {0} levels")]
    BranchTooLong(usize),

    #[error("invalid script: {0}")]
    InvalidScript(String),

    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    #[error("unknown import proof kind: {0:#04x}")]
    UnknownProofKind(u8),

    #[error("unexpected eval code: expected {expected:#04x}, got {got:#04x}")]
    UnexpectedEvalCode { expected: u8, got: u8 },

    #[error("missing op_return output")]
    MissingOpReturn,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
