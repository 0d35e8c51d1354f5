//! Error types for the crosschain facade and the import validator.

use std::fmt;

use crosschain_authority::AuthorityError;
use crosschain_core::CoreError;
use crosschain_proof::ProofError;
use crosschain_store::StoreError;
use thiserror::Error;

/// Errors from node operations other than import validation.
#[derive(Debug, Error)]
pub enum CrosschainError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Proof construction failed.
    #[error("proof error: {0}")]
    Proof(#[from] ProofError),

    /// Notary directory error.
    #[error("authority error: {0}")]
    Authority(#[from] AuthorityError),

    /// Encoding error.
    #[error("codec error: {0}")]
    Core(#[from] CoreError),

    /// Configuration parse error.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, CrosschainError>;

/// Why an import transaction is invalid.
///
/// Displays as the short machine-readable tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    TooFewVouts,
    InvalidParams,
    InvalidBurnTx,
    NonCanonical,
    AlreadyImported,
    InvalidBurnAmount,
    WrongPayouts,
    PayoutTooHighOrTooLow,
    ChainNotFungible,
    WrongChain,
    TokenAmountMismatch,
    TokenProvenanceMismatch,
    MoMoMCheckFail,
    NotariesApprovalCheckFail,
    SelfImportNotEnabled,
    SelfImportInvalidSigner,
    ExternalCheckFailed,
    ExternalCheckTimeout,
    GatewayQuorumNotMet,
    GatewayInvalidProof,
    GatewayDepositMismatch,
    GatewayDestinationMismatch,
}

impl Rejection {
    pub fn tag(self) -> &'static str {
        match self {
            Rejection::TooFewVouts => "too-few-vouts",
            Rejection::InvalidParams => "invalid-params",
            Rejection::InvalidBurnTx => "invalid-burn-tx",
            Rejection::NonCanonical => "non-canonical",
            Rejection::AlreadyImported => "already-imported",
            Rejection::InvalidBurnAmount => "invalid-burn-amount",
            Rejection::WrongPayouts => "wrong-payouts",
            Rejection::PayoutTooHighOrTooLow => "payout-too-high-or-too-low",
            Rejection::ChainNotFungible => "chain-not-fungible",
            Rejection::WrongChain => "importcoin-wrong-chain",
            Rejection::TokenAmountMismatch => "token-amount-mismatch",
            Rejection::TokenProvenanceMismatch => "token-provenance-mismatch",
            Rejection::MoMoMCheckFail => "momom-check-fail",
            Rejection::NotariesApprovalCheckFail => "notaries-approval-check-fail",
            Rejection::SelfImportNotEnabled => "selfimport-not-enabled",
            Rejection::SelfImportInvalidSigner => "selfimport-invalid-signer",
            Rejection::ExternalCheckFailed => "external-check-failed",
            Rejection::ExternalCheckTimeout => "external-check-timeout",
            Rejection::GatewayQuorumNotMet => "gateway-quorum-not-met",
            Rejection::GatewayInvalidProof => "gateway-invalid-proof",
            Rejection::GatewayDepositMismatch => "gateway-deposit-mismatch",
            Rejection::GatewayDestinationMismatch => "gateway-destination-mismatch",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Outcome of a failed import validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    /// Consensus violation; never becomes valid.
    #[error("invalid import: {0}")]
    Invalid(Rejection),

    /// Depends on a notarisation not seen yet; may become valid later.
    #[error("import not yet confirmed: {0}")]
    Indeterminate(String),
}

impl ImportError {
    /// Tag of an invalid import, `None` when indeterminate.
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            ImportError::Invalid(r) => Some(*r),
            ImportError::Indeterminate(_) => None,
        }
    }
}

impl From<Rejection> for ImportError {
    fn from(r: Rejection) -> Self {
        ImportError::Invalid(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_display_is_tag() {
        assert_eq!(Rejection::WrongPayouts.to_string(), "wrong-payouts");
        assert_eq!(
            ImportError::Invalid(Rejection::WrongChain).to_string(),
            "invalid import: importcoin-wrong-chain"
        );
        assert_eq!(ImportError::Indeterminate("x".into()).rejection(), None);
    }
}
