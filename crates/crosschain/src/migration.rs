//! Token migration rules for same-network imports.

use crosschain_core::import::{token_creation_from_payouts, token_value};
use crosschain_core::{Transaction, TokenMigration, TxOut};

use crate::error::Rejection;

/// Tokens burned must reappear in full, and the creation record carried by
/// the payouts must match the one committed by the burn.
pub fn check_token_migration(
    burn_tx: &Transaction,
    payouts: &[TxOut],
    migration: &TokenMigration,
) -> Result<(), Rejection> {
    let burned = token_value(&burn_tx.outputs, &migration.token_id);
    let imported = token_value(payouts, &migration.token_id);
    if burned != imported {
        return Err(Rejection::TokenAmountMismatch);
    }
    match token_creation_from_payouts(payouts) {
        Some(creation) if creation == migration.creation => Ok(()),
        _ => Err(Rejection::TokenProvenanceMismatch),
    }
}
