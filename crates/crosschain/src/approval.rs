//! Notary approval lists, the fallback proof for imports.
//!
//! Each approval is a transaction funded by one current notary whose last
//! output publishes an [`InclusionProof`] for the burn.

use std::collections::HashSet;

use tracing::debug;

use crosschain_authority::NotaryLookup;
use crosschain_core::{deserialize, ChainView, InclusionProof, TxId};

/// Whether at least `quorum` distinct current notaries published a
/// self-consistent inclusion proof naming `burn_txid`.
pub fn check_notaries_approval<C: ChainView + ?Sized>(
    chain: &C,
    lookup: &dyn NotaryLookup,
    burn_txid: &TxId,
    approval_txids: &[TxId],
    quorum: usize,
    is_hub: bool,
) -> bool {
    let Some(tip) = chain.tip_height().and_then(|h| chain.block_at(h)) else {
        return false;
    };
    let Some(authority) = lookup.notaries_for_height_and_time(tip.height, tip.time, is_hub) else {
        return false;
    };

    let mut approvers = HashSet::new();
    for txid in approval_txids {
        let Some((tx, Some(_))) = chain.transaction(txid) else {
            debug!(%txid, "approval not confirmed");
            continue;
        };
        let signer = tx
            .inputs
            .first()
            .and_then(|input| chain.spent_output(&input.prevout))
            .and_then(|out| out.script_pubkey.as_pay_to_pubkey());
        let Some(signer) = signer.filter(|pk| authority.contains(pk)) else {
            debug!(%txid, "approval not funded by a current notary");
            continue;
        };
        let proof = tx
            .outputs
            .last()
            .and_then(|out| out.script_pubkey.op_return_data())
            .and_then(|data| deserialize::<InclusionProof>(data).ok());
        match proof {
            Some(proof) if proof.txid == *burn_txid && proof.is_self_consistent() => {
                approvers.insert(signer);
            }
            _ => debug!(%txid, "approval does not prove the burn"),
        }
    }
    approvers.len() >= quorum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosschain_authority::{CrosschainAuthority, NotaryDirectory, NotarySeason};
    use crosschain_core::{
        serialize, Hash256, Keypair, MemoryChain, MerkleBranch, OutPoint, Script, Transaction,
        TxIn, TxOut,
    };

    struct Fixture {
        chain: MemoryChain,
        funding: Transaction,
        directory: NotaryDirectory,
        burn: TxId,
    }

    fn fixture() -> Fixture {
        let keys: Vec<Keypair> = (0..5).map(|i| Keypair::from_seed(&[i + 10; 32])).collect();
        let chain = MemoryChain::new();
        let funding = Transaction {
            outputs: keys
                .iter()
                .flat_map(|k| {
                    let pk = k.public_key();
                    (0..2).map(move |_| TxOut::new(1, Script::pay_to_pubkey(&pk)))
                })
                .collect(),
            ..Default::default()
        };
        chain.push_block(vec![funding.clone()], 1_000);
        let directory = NotaryDirectory {
            seasons: vec![NotarySeason {
                start_height: 0,
                start_time: 0,
                authority: CrosschainAuthority::new(
                    keys[..4].iter().map(Keypair::public_key).collect(),
                    3,
                )
                .unwrap(),
            }],
            ..Default::default()
        };
        Fixture {
            chain,
            funding,
            directory,
            burn: Hash256([0xb0; 32]),
        }
    }

    /// Approval by notary `k` using its `slot`th funding output.
    fn approval(fx: &Fixture, k: usize, slot: u32, proven: TxId) -> Transaction {
        let leaves = [Hash256([1; 32]), proven];
        let proof = InclusionProof {
            merkle_root: crosschain_core::merkle_root(&leaves),
            txid: proven,
            branch: MerkleBranch::from_leaves(&leaves, 1).unwrap(),
        };
        Transaction {
            inputs: vec![TxIn::new(OutPoint::new(fx.funding.txid(), k as u32 * 2 + slot))],
            outputs: vec![TxOut::new(0, Script::op_return(&serialize(&proof)))],
            ..Default::default()
        }
    }

    #[test]
    fn test_quorum_of_distinct_notaries() {
        let fx = fixture();
        let approvals: Vec<_> = (0..3).map(|k| approval(&fx, k, 0, fx.burn)).collect();
        fx.chain.push_block(approvals.clone(), 1_060);
        let ids: Vec<TxId> = approvals.iter().map(Transaction::txid).collect();

        assert!(check_notaries_approval(&fx.chain, &fx.directory, &fx.burn, &ids, 3, true));
        assert!(!check_notaries_approval(&fx.chain, &fx.directory, &fx.burn, &ids, 4, true));
        assert!(!check_notaries_approval(&fx.chain, &fx.directory, &Hash256([1; 32]), &ids, 1, true));
    }

    #[test]
    fn test_repeated_notary_counts_once() {
        let fx = fixture();
        let approvals = vec![
            approval(&fx, 0, 0, fx.burn),
            approval(&fx, 0, 1, fx.burn),
            approval(&fx, 1, 0, fx.burn),
        ];
        fx.chain.push_block(approvals.clone(), 1_060);
        let ids: Vec<TxId> = approvals.iter().map(Transaction::txid).collect();
        assert!(!check_notaries_approval(&fx.chain, &fx.directory, &fx.burn, &ids, 3, true));
    }

    #[test]
    fn test_outsider_and_unconfirmed_ignored() {
        let fx = fixture();
        // Key 4 is funded but not a notary.
        let outsider = approval(&fx, 4, 0, fx.burn);
        let confirmed = approval(&fx, 0, 0, fx.burn);
        fx.chain.push_block(vec![outsider.clone(), confirmed.clone()], 1_060);
        let pending = approval(&fx, 1, 0, fx.burn);
        fx.chain.add_to_mempool(pending.clone());

        let ids = [outsider.txid(), confirmed.txid(), pending.txid()];
        assert!(check_notaries_approval(&fx.chain, &fx.directory, &fx.burn, &ids, 1, true));
        assert!(!check_notaries_approval(&fx.chain, &fx.directory, &fx.burn, &ids, 2, true));
    }
}
