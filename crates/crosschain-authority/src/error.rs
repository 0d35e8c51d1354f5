//! Error types for the authority module.

use thiserror::Error;

/// Errors raised while building or loading a notary directory.
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// More notaries than an authority can hold.
    #[error("authority has {0} notaries, at most 64 allowed")]
    TooManyNotaries(usize),

    /// Required signatures outside `1..=size`.
    #[error("required signatures {required} invalid for {size} notaries")]
    InvalidThreshold { required: usize, size: usize },

    /// The same key listed twice in one authority.
    #[error("duplicate notary key {0}")]
    DuplicateNotary(String),

    /// Seasons must start in increasing height and time order.
    #[error("season {0} does not start after the previous season")]
    UnorderedSeasons(usize),

    /// Eras must be ordered and separated by a gap.
    #[error("era {0} overlaps or touches the previous era")]
    OverlappingEras(usize),

    /// Cut-over list and authority list lengths differ.
    #[error("{cutovers} era cut-overs for {authorities} authorities")]
    EraCountMismatch { cutovers: usize, authorities: usize },

    /// Configuration parse error.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for authority operations.
pub type Result<T> = std::result::Result<T, AuthorityError>;
