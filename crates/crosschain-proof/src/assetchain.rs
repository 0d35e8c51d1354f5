//! Source-chain proof: transaction to block to MoM.

use tracing::debug;

use crosschain_core::{ChainView, MerkleBranch, MerkleTree, TxId, TxProof};
use crosschain_store::{KvStore, NotarisationDb};

use crate::error::{ProofError, Result};
use crate::root::mom_leaves;
use crate::NOTARISATION_SCAN_LIMIT_BLOCKS;

/// Prove `txid` into the MoM of the first own back-notarisation covering
/// its block.
///
/// The returned proof is anchored at the hub notarisation the
/// back-notarisation points to.
pub fn get_assetchain_proof<S, C>(
    db: &NotarisationDb<S>,
    chain: &C,
    symbol: &str,
    txid: &TxId,
) -> Result<TxProof>
where
    S: KvStore,
    C: ChainView + ?Sized,
{
    let (_, block) = chain
        .transaction(txid)
        .ok_or(ProofError::TransactionNotFound(*txid))?;
    let block = block.ok_or(ProofError::InMempool(*txid))?;

    // The first notarisation at or above the block height is assumed to
    // include it.
    let (_, nota) = db
        .scan_forward(chain, block.height, NOTARISATION_SCAN_LIMIT_BLOCKS, |n| {
            n.symbol() == symbol && n.data.height >= block.height
        })
        .ok_or(ProofError::NotNotarisedYet)?;
    let back = nota.data.back.as_ref().ok_or(ProofError::NotNotarisedYet)?;

    let offset = nota.data.height - block.height;
    let depth = nota.data.mom_depth;
    if offset >= u32::from(depth) {
        return Err(ProofError::BlockOutsideWindow { offset, depth });
    }

    // Block Merkle root to MoM.
    let leaves = mom_leaves(chain, nota.data.height, depth)
        .ok_or(ProofError::BlockOutsideWindow { offset, depth })?;
    let block_branch = MerkleBranch::from_leaves(&leaves, offset as usize)
        .ok_or(ProofError::BlockToMomMismatch)?;
    if block_branch.exec(&block.merkle_root) != Some(nota.data.mom) {
        return Err(ProofError::BlockToMomMismatch);
    }

    // Transaction to block Merkle root.
    let txids = chain
        .block_txids(&block.hash)
        .ok_or(ProofError::TxNotInBlock)?;
    let position = txids
        .iter()
        .position(|id| id == txid)
        .ok_or(ProofError::TxNotInBlock)?;
    let tx_branch = MerkleTree::build(&txids)
        .branch(position)
        .and_then(|branch| Some(MerkleBranch::new(u32::try_from(position).ok()?, branch)))
        .ok_or(ProofError::TxNotInBlock)?;
    if tx_branch.exec(txid) != Some(block.merkle_root) {
        return Err(ProofError::TxToBlockMismatch);
    }

    let branch = tx_branch.compose(block_branch)?;
    if branch.exec(txid) != Some(nota.data.mom) {
        return Err(ProofError::MomMismatch);
    }
    debug!(%txid, notarised_height = nota.data.height, index = branch.index, "built assetchain proof");
    Ok(TxProof::new(back.tx_hash, branch))
}
