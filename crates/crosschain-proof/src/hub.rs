//! Hub-side proof extension and import completion.
//!
//! A source proof ends at a MoM committed on the hub. Extending it means
//! finding the target chain's notarisation that covers that MoM, building
//! the MoM into the target's MoMoM, and composing the two branches.

use tracing::debug;

use crosschain_core::{
    make_import_coin_transaction, unmarshal_burn_tx, unmarshal_import_tx, ChainView, Hash256,
    ImportProof, MerkleBranch, Transaction, TxId, TxProof,
};
use crosschain_store::{KvStore, NotarisationDb};

use crate::error::{ProofError, Result};
use crate::root::{calculate_proof_root, ProofRoot};
use crate::{BACK_NOTARISATION_RESCAN_DEPTH, NOTARISATION_SCAN_LIMIT_BLOCKS};

/// Extend `source_proof` (txid to source MoM) to the MoMoM of the target
/// chain's next notarisation.
///
/// `height_offset` moves the root calculation that many hub blocks past
/// the target notarisation.
pub fn get_cross_chain_proof<S, C>(
    db: &NotarisationDb<S>,
    chain: &C,
    txid: &TxId,
    target_symbol: &str,
    target_cc_id: u32,
    source_proof: &TxProof,
    height_offset: u32,
) -> Result<TxProof>
where
    S: KvStore,
    C: ChainView + ?Sized,
{
    let mom = source_proof
        .branch
        .exec(txid)
        .ok_or(ProofError::ProofCheckFailed)?;

    let source_nota = source_proof.notarisation_txid;
    let source_height = match chain.transaction(&source_nota) {
        Some((_, Some(block))) => block.height,
        _ => return Err(ProofError::NotarisationNotFound(source_nota)),
    };

    // Scanning backward from the source could stop at a target notarisation
    // that predates it; the first one at or after the source includes it.
    let (target_height, _) = db
        .scan_forward(chain, source_height, NOTARISATION_SCAN_LIMIT_BLOCKS, |n| {
            n.symbol() == target_symbol
        })
        .ok_or_else(|| ProofError::NoTargetNotarisation(target_symbol.to_string()))?;
    let kmd_height = target_height
        .checked_add(height_offset)
        .ok_or(ProofError::Indeterminate)?;

    let ProofRoot::Determinate {
        mom_mom,
        moms,
        anchor_txid,
    } = calculate_proof_root(db, chain, target_symbol, target_cc_id, kmd_height)
    else {
        return Err(ProofError::Indeterminate);
    };

    let position = moms
        .iter()
        .position(|m| *m == mom)
        .ok_or(ProofError::MomNotInWindow)?;
    let outer = MerkleBranch::from_leaves(&moms, position).ok_or(ProofError::MomNotInWindow)?;
    let branch = source_proof.branch.clone().compose(outer)?;

    if branch.exec(txid) != Some(mom_mom) {
        return Err(ProofError::ProofCheckFailed);
    }
    debug!(%txid, target_symbol, kmd_height, %anchor_txid, "extended proof to MoMoM");
    Ok(TxProof::new(anchor_txid, branch))
}

/// Rebuild `import_tx` around a proof extended to its target's MoMoM.
///
/// The result depends only on the extended proof, the burn transaction,
/// the payouts and the original expiry height.
pub fn complete_import_transaction<S, C>(
    db: &NotarisationDb<S>,
    chain: &C,
    import_tx: &Transaction,
    height_offset: u32,
) -> Result<Transaction>
where
    S: KvStore,
    C: ChainView + ?Sized,
{
    let payload = unmarshal_import_tx(import_tx)?;
    let burn = unmarshal_burn_tx(&payload.burn_tx)?;
    let source_proof = payload
        .proof
        .as_tx_proof()
        .ok_or(ProofError::NotMerkleBranch)?;

    let extended = get_cross_chain_proof(
        db,
        chain,
        &payload.burn_tx.txid(),
        &burn.target_symbol,
        burn.target_cc_id,
        source_proof,
        height_offset,
    )?;
    Ok(make_import_coin_transaction(
        ImportProof::MerkleBranch(extended),
        payload.burn_tx,
        payload.payouts,
        import_tx.expiry_height,
    ))
}

/// Whether a back-notarisation near the one backing `notarisation_txid`
/// commits `mom_mom`.
///
/// Back-notarisations can land out of order or several per block, so the
/// scan starts a fixed depth below the dereferenced one. A missing
/// back-notarisation is an error: it may simply not have arrived yet.
pub fn check_mo_mom<S, C>(
    db: &NotarisationDb<S>,
    chain: &C,
    notarisation_txid: &TxId,
    mom_mom: &Hash256,
) -> Result<bool>
where
    S: KvStore,
    C: ChainView + ?Sized,
{
    let back = db
        .get_back_notarisation(notarisation_txid)
        .ok_or(ProofError::BackNotarisationNotFound(*notarisation_txid))?;
    let Some((_, Some(block))) = chain.transaction(&back.txid) else {
        debug!(txid = %back.txid, "back-notarisation not on active chain");
        return Ok(false);
    };

    let from = block.height.saturating_sub(BACK_NOTARISATION_RESCAN_DEPTH);
    let found = db.scan_forward(chain, from, NOTARISATION_SCAN_LIMIT_BLOCKS, |n| {
        n.data.is_back() && n.data.mom_mom() == *mom_mom
    });
    Ok(found.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{back, coinbase, forward, hub_with_blocks};
    use crosschain_core::{
        make_burn_output, payouts_hash, serialize, BurnDescriptor, MemoryChain, Notarisation,
        Script, TxOut,
    };
    use crosschain_store::MemoryStore;

    struct Hub {
        db: NotarisationDb<MemoryStore>,
        chain: MemoryChain,
        /// Leaf proven by `source`.
        leaf: TxId,
        source: TxProof,
        target_anchor: TxId,
    }

    /// Hub with A's notarisation in block 4, C's in block 5 and the target
    /// B's in block 6.
    fn hub() -> Hub {
        let chain = hub_with_blocks(4);
        let nota_a = coinbase(1_004);
        let nota_c = coinbase(1_005);
        let nota_b = coinbase(1_006);
        for (h, tx) in [(4u32, &nota_a), (5, &nota_c), (6, &nota_b)] {
            chain.push_block(vec![tx.clone()], 1_000 + h * 60);
        }
        for h in 7..12u32 {
            chain.push_block(vec![coinbase(h)], 1_000 + h * 60);
        }

        let leaf = coinbase(77).txid();
        let leaves = [Hash256([1; 32]), leaf, Hash256([3; 32])];
        let source_branch = MerkleBranch::from_leaves(&leaves, 1).unwrap();
        let mom_a = source_branch.exec(&leaf).unwrap();

        let db = NotarisationDb::new(MemoryStore::new());
        let with_txid = |mut n: Notarisation, txid: TxId, mom: Hash256| {
            n.txid = txid;
            n.data.mom = mom;
            n
        };
        let put = |h: u32, notas: Vec<Notarisation>| {
            let block = chain.block_at(h).unwrap();
            db.connect_block(&block.hash, &notas, &[]).unwrap();
        };
        put(4, vec![with_txid(forward("ASSETA", 200, 0, 0), nota_a.txid(), mom_a)]);
        put(5, vec![with_txid(forward("ASSETC", 200, 0, 0), nota_c.txid(), Hash256([0xc; 32]))]);
        put(6, vec![with_txid(forward("ASSETB", 200, 0, 0), nota_b.txid(), Hash256([0xb; 32]))]);

        Hub {
            source: TxProof::new(nota_a.txid(), source_branch),
            leaf,
            target_anchor: nota_b.txid(),
            db,
            chain,
        }
    }

    #[test]
    fn test_extends_to_momom() {
        let hub = hub();
        let proof =
            get_cross_chain_proof(&hub.db, &hub.chain, &hub.leaf, "ASSETB", 200, &hub.source, 0)
                .unwrap();
        assert_eq!(proof.notarisation_txid, hub.target_anchor);

        let root = calculate_proof_root(&hub.db, &hub.chain, "ASSETB", 200, 6);
        assert_eq!(proof.branch.exec(&hub.leaf), root.mom_mom());
        // B, C, then A in backward scan order.
        assert_eq!(proof.branch.index >> 2, 2);
    }

    #[test]
    fn test_extension_errors() {
        let hub = hub();
        let mut unknown = hub.source.clone();
        unknown.notarisation_txid = Hash256([9; 32]);
        assert_eq!(
            get_cross_chain_proof(&hub.db, &hub.chain, &hub.leaf, "ASSETB", 200, &unknown, 0),
            Err(ProofError::NotarisationNotFound(Hash256([9; 32])))
        );
        assert_eq!(
            get_cross_chain_proof(&hub.db, &hub.chain, &hub.leaf, "ASSETZ", 200, &hub.source, 0),
            Err(ProofError::NoTargetNotarisation("ASSETZ".into()))
        );
        assert_eq!(
            get_cross_chain_proof(&hub.db, &hub.chain, &hub.leaf, "ASSETB", 300, &hub.source, 0),
            Err(ProofError::MomNotInWindow)
        );
        assert_eq!(
            get_cross_chain_proof(&hub.db, &hub.chain, &hub.leaf, "ASSETB", 200, &hub.source, 50),
            Err(ProofError::Indeterminate)
        );
        // A leaf unrelated to A's MoM.
        let other_leaf = Hash256([3; 32]);
        assert_eq!(
            get_cross_chain_proof(&hub.db, &hub.chain, &other_leaf, "ASSETB", 200, &hub.source, 0),
            Err(ProofError::MomNotInWindow)
        );
        // A leaf equal to its right-hand sibling never reduces to a root.
        let duplicate = Hash256([1; 32]);
        assert_eq!(
            get_cross_chain_proof(&hub.db, &hub.chain, &duplicate, "ASSETB", 200, &hub.source, 0),
            Err(ProofError::ProofCheckFailed)
        );
    }

    fn import_for(hub: &Hub, payouts: Vec<TxOut>) -> Transaction {
        // The burn tx itself is the proven leaf in this fixture, so prove it
        // from scratch: A's MoM is the burn txid alone.
        let descriptor = BurnDescriptor {
            target_cc_id: 200,
            target_symbol: "ASSETB".into(),
            payouts_hash: payouts_hash(&payouts),
            raw_proof: Vec::new(),
            token: None,
        };
        let burn = Transaction {
            outputs: vec![make_burn_output(1_000, &descriptor)],
            ..Default::default()
        };
        let proof = TxProof::new(hub.source.notarisation_txid, MerkleBranch::new(0, Vec::new()));
        make_import_coin_transaction(ImportProof::MerkleBranch(proof), burn, payouts, 42)
    }

    #[test]
    fn test_complete_import_is_deterministic() {
        let hub = hub();
        let payouts = vec![TxOut::new(990, Script::from(vec![0x51]))];
        let import = import_for(&hub, payouts.clone());
        let burn = unmarshal_import_tx(&import).unwrap().burn_tx;

        // Point A's notarisation at the burn txid as its whole MoM.
        let block = hub.chain.block_at(4).unwrap();
        let mut notas = hub.db.get_block_notarisations(&block.hash).unwrap();
        notas[0].data.mom = burn.txid();
        hub.db.connect_block(&block.hash, &notas, &[]).unwrap();

        let first = complete_import_transaction(&hub.db, &hub.chain, &import, 0).unwrap();
        let second = complete_import_transaction(&hub.db, &hub.chain, &import, 0).unwrap();
        assert_eq!(serialize(&first), serialize(&second));
        assert_eq!(first.expiry_height, 42);

        let payload = unmarshal_import_tx(&first).unwrap();
        assert_eq!(payload.payouts, payouts);
        let proof = payload.proof.as_tx_proof().unwrap();
        assert_eq!(proof.notarisation_txid, hub.target_anchor);
        assert_eq!(
            proof.branch.exec(&burn.txid()),
            calculate_proof_root(&hub.db, &hub.chain, "ASSETB", 200, 6).mom_mom()
        );

        let approvals = make_import_coin_transaction(
            ImportProof::NotaryTxids(vec![Hash256([1; 32])]),
            burn,
            payouts,
            42,
        );
        assert_eq!(
            complete_import_transaction(&hub.db, &hub.chain, &approvals, 0),
            Err(ProofError::NotMerkleBranch)
        );
    }

    #[test]
    fn test_check_mo_mom_rescans_around_back_notarisation() {
        let chain = MemoryChain::new();
        for h in 0..150u32 {
            chain.push_block(vec![coinbase(h)], 1_000 + h * 60);
        }
        let db = NotarisationDb::new(MemoryStore::new());
        let anchor = Hash256([0xa1; 32]);
        let momom = Hash256([0xee; 32]);

        // Backing record confirmed at 140; the matching MoMoM arrived
        // earlier at 45, within the rescan depth.
        let backing = back(coinbase(140).txid(), "ASSETB", 9, Hash256::ZERO, 4, anchor, Hash256([1; 32]));
        let matching = back(coinbase(45).txid(), "ASSETB", 8, Hash256::ZERO, 4, Hash256([2; 32]), momom);
        for (h, n) in [(140u32, backing), (45, matching)] {
            let block = chain.block_at(h).unwrap();
            db.connect_block(&block.hash, &vec![n], &[]).unwrap();
        }

        assert_eq!(check_mo_mom(&db, &chain, &anchor, &momom), Ok(true));
        assert_eq!(check_mo_mom(&db, &chain, &anchor, &Hash256([7; 32])), Ok(false));
        assert_eq!(
            check_mo_mom(&db, &chain, &Hash256([5; 32]), &momom),
            Err(ProofError::BackNotarisationNotFound(Hash256([5; 32])))
        );
    }
}
