//! MoM and MoMoM calculation.

use tracing::debug;

use crosschain_authority::authority_for_symbol;
use crosschain_core::{merkle_root, ChainView, Hash256, TxId};
use crosschain_store::{KvStore, NotarisationDb};

use crate::{MAX_OWN_NOTARISATIONS_IN_WINDOW, NOTARISATION_SCAN_LIMIT_BLOCKS};

/// Block Merkle roots of the `depth` blocks ending at `height`, newest
/// first. These are the leaves of the MoM committed at `height`.
pub fn mom_leaves<C: ChainView + ?Sized>(chain: &C, height: u32, depth: u16) -> Option<Vec<Hash256>> {
    (0..u32::from(depth))
        .map(|i| {
            let h = height.checked_sub(i)?;
            chain.block_at(h).map(|b| b.merkle_root)
        })
        .collect()
}

/// Merkle root over a window of block Merkle roots.
pub fn compute_mom<C: ChainView + ?Sized>(chain: &C, height: u32, depth: u16) -> Option<Hash256> {
    mom_leaves(chain, height, depth).map(|leaves| merkle_root(&leaves))
}

/// Result of a proof-root calculation on the hub chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProofRoot {
    Determinate {
        /// Merkle root over `moms`.
        mom_mom: Hash256,
        /// Distinct MoMs in first-seen order.
        moms: Vec<Hash256>,
        /// The newest notarisation of the calling chain in the window.
        anchor_txid: TxId,
    },
    /// Not notarised yet; callers must not treat this as invalid.
    Indeterminate,
}

impl ProofRoot {
    pub fn mom_mom(&self) -> Option<Hash256> {
        match self {
            ProofRoot::Determinate { mom_mom, .. } => Some(*mom_mom),
            ProofRoot::Indeterminate => None,
        }
    }
}

/// Scan the hub backward from `kmd_height` and gather the MoMs for
/// `target_cc_id` into a MoMoM.
///
/// The block in which the seventh notarisation of `symbol` is seen ends
/// the scan before its own MoMs are taken.
pub fn calculate_proof_root<S, C>(
    db: &NotarisationDb<S>,
    chain: &C,
    symbol: &str,
    target_cc_id: u32,
    kmd_height: u32,
) -> ProofRoot
where
    S: KvStore,
    C: ChainView + ?Sized,
{
    if target_cc_id < 2 {
        return ProofRoot::Indeterminate;
    }
    match chain.tip_height() {
        Some(tip) if kmd_height <= tip => {}
        _ => return ProofRoot::Indeterminate,
    }

    let family = authority_for_symbol(symbol);
    let mut seen_own = 0usize;
    let mut anchor_txid = None;
    let mut moms: Vec<Hash256> = Vec::new();

    'scan: for i in 0..NOTARISATION_SCAN_LIMIT_BLOCKS {
        if i > kmd_height {
            break;
        }
        let Some(block) = chain.block_at(kmd_height - i) else {
            continue;
        };
        let Some(notarisations) = db.get_block_notarisations(&block.hash) else {
            continue;
        };

        for nota in notarisations.iter().filter(|n| n.symbol() == symbol) {
            seen_own += 1;
            if seen_own == 1 {
                anchor_txid = Some(nota.txid);
            } else if seen_own == MAX_OWN_NOTARISATIONS_IN_WINDOW {
                break 'scan;
            }
        }

        if seen_own >= 1 {
            for nota in &notarisations {
                if u32::from(nota.data.cc_id) == target_cc_id
                    && authority_for_symbol(nota.symbol()) == family
                    && !moms.contains(&nota.data.mom)
                {
                    moms.push(nota.data.mom);
                }
            }
        }
    }

    let Some(anchor_txid) = anchor_txid else {
        debug!(symbol, kmd_height, "no own notarisation in scan window");
        return ProofRoot::Indeterminate;
    };
    debug!(symbol, kmd_height, moms = moms.len(), "calculated proof root");
    ProofRoot::Determinate {
        mom_mom: merkle_root(&moms),
        moms,
        anchor_txid,
    }
}
